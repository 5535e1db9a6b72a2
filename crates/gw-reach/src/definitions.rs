//! Gaged-reach definitions: which boundary-condition reaches make up each
//! monitoring point.
//!
//! The file is comma-delimited with one header row, records
//! `gaged_reach_id,bc_type,bc_id` and any further columns ignored. For
//! packages with layered features `bc_id` is a 2D id; otherwise it is the
//! stable reach id itself.

use std::path::Path;

use gw_core::{BcType, GagedReachId, Reach2dId};

use crate::error::{ReachError, ReachResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GagedReachDefinition {
    pub id: GagedReachId,
    /// Bc types in first-seen order, each with its member ids in first-seen
    /// order and without repeats.
    members: Vec<(BcType, Vec<Reach2dId>)>,
}

impl GagedReachDefinition {
    pub fn new(id: impl Into<GagedReachId>) -> Self {
        Self {
            id: id.into(),
            members: Vec::new(),
        }
    }

    /// Add a member; repeats are ignored.
    pub fn add_member(&mut self, bc_type: BcType, member: Reach2dId) {
        match self.members.iter_mut().find(|(bc, _)| *bc == bc_type) {
            Some((_, ids)) => {
                if !ids.contains(&member) {
                    ids.push(member);
                }
            }
            None => self.members.push((bc_type, vec![member])),
        }
    }

    pub fn bc_types(&self) -> impl Iterator<Item = BcType> + '_ {
        self.members.iter().map(|(bc, _)| *bc)
    }

    pub fn members(&self, bc_type: BcType) -> &[Reach2dId] {
        self.members
            .iter()
            .find(|(bc, _)| *bc == bc_type)
            .map(|(_, ids)| ids.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GagedReachDefinitions {
    reaches: Vec<GagedReachDefinition>,
}

impl GagedReachDefinitions {
    pub fn load(path: &Path) -> ReachResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReachError::io(path, e))?;
        let defs = Self::parse(&text, path)?;
        tracing::info!(
            path = %path.display(),
            gaged_reaches = defs.len(),
            "Loaded gaged-reach definitions"
        );
        Ok(defs)
    }

    pub fn parse(text: &str, origin: &Path) -> ReachResult<Self> {
        let mut defs = Self::default();
        for (idx, line) in text.lines().enumerate().skip(1) {
            let line = line.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            let malformed = |reason: String| ReachError::Definition {
                path: origin.to_path_buf(),
                line_no: idx + 1,
                reason,
            };
            let fields: Vec<&str> = line.split(',').collect();
            if fields.len() < 3 {
                return Err(malformed(format!(
                    "expected gaged_reach_id,bc_type,bc_id but found {} field(s)",
                    fields.len()
                )));
            }
            let bc_type: BcType = fields[1]
                .parse()
                .map_err(|e| malformed(format!("{e}")))?;
            let member: u32 = fields[2]
                .trim()
                .parse()
                .map_err(|_| malformed(format!("can't convert '{}' to an integer", fields[2])))?;
            defs.add(fields[0].trim(), bc_type, Reach2dId(member));
        }
        Ok(defs)
    }

    pub fn add(&mut self, gaged_reach: &str, bc_type: BcType, member: Reach2dId) {
        let idx = match self.reaches.iter().position(|r| r.id == gaged_reach) {
            Some(idx) => idx,
            None => {
                self.reaches.push(GagedReachDefinition::new(gaged_reach));
                self.reaches.len() - 1
            }
        };
        self.reaches[idx].add_member(bc_type, member);
    }

    pub fn iter(&self) -> impl Iterator<Item = &GagedReachDefinition> {
        self.reaches.iter()
    }

    pub fn get(&self, id: &str) -> Option<&GagedReachDefinition> {
        self.reaches.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.reaches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reaches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_first_seen_order_and_drops_repeats() {
        let text = "gaged_reach_id,bc_type,bc_id,comment\n\
                    G2,drn,5,x\n\
                    G1,riv,9\n\
                    G2,riv,4\n\
                    G2,drn,5\n\
                    \n\
                    G2,drn,6\n";
        let defs = GagedReachDefinitions::parse(text, Path::new("defs.csv")).unwrap();
        let ids: Vec<&str> = defs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["G2", "G1"]);

        let g2 = defs.get("G2").unwrap();
        assert_eq!(g2.bc_types().collect::<Vec<_>>(), vec![BcType::Drain, BcType::River]);
        assert_eq!(g2.members(BcType::Drain), &[Reach2dId(5), Reach2dId(6)]);
        assert!(g2.members(BcType::GeneralHead).is_empty());
    }

    #[test]
    fn bad_rows_report_line_numbers() {
        let err = GagedReachDefinitions::parse("h\nG1,riv,abc\n", Path::new("d.csv")).unwrap_err();
        assert!(matches!(err, ReachError::Definition { line_no: 2, .. }));
        let err = GagedReachDefinitions::parse("h\nG1,wel,3\n", Path::new("d.csv")).unwrap_err();
        assert!(matches!(err, ReachError::Definition { .. }));
        let err = GagedReachDefinitions::parse("h\nG1\n", Path::new("d.csv")).unwrap_err();
        assert_eq!(err.kind(), gw_listing::ErrorKind::Malformed);
    }
}
