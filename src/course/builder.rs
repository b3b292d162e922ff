//! Course deduplication.
//!
//! Runners of one group may run different control sequences (forked courses,
//! mispunches, individual start orders). The `CourseBuilder` collects every
//! member's ordered leg list and collapses identical lists into one course.
//!
//! Sequences built from ordinal controls never merge with printed ones, and
//! their leg ids carry the group so other groups cannot share them.

use std::collections::BTreeMap;

use crate::core::types::{CourseId, GroupId, Leg, LegId};

/// A canonical course of a group and the members that ran it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispersion {
    pub id: CourseId,
    pub legs: Vec<Leg>,
    /// Event-wide ids of `legs`, in course order
    pub leg_ids: Vec<LegId>,
    pub ordinal_codes: bool,
    /// Member positions within the group, ascending
    pub members: Vec<usize>,
}

/// Collects member leg sequences of a single group
#[derive(Debug, Clone)]
pub struct CourseBuilder {
    group: GroupId,
    sequences: BTreeMap<(Vec<Leg>, bool), Vec<usize>>,
}

impl CourseBuilder {
    #[must_use]
    pub fn new(group: GroupId) -> Self {
        Self {
            group,
            sequences: BTreeMap::new(),
        }
    }

    /// Record the leg sequence run by group member `member`
    pub fn add(&mut self, member: usize, legs: &[Leg], ordinal_codes: bool) {
        self.sequences
            .entry((legs.to_vec(), ordinal_codes))
            .or_default()
            .push(member);
    }

    /// Number of distinct courses collected so far
    #[must_use]
    pub fn course_count(&self) -> usize {
        self.sequences.len()
    }

    /// Number the distinct sequences `GROUP#1..n` in lexicographic leg order.
    ///
    /// Numbering depends only on the set of sequences, never on the order in
    /// which members were added.
    #[must_use]
    pub fn build(self) -> Vec<Dispersion> {
        let group = self.group;
        self.sequences
            .into_iter()
            .enumerate()
            .map(|(i, ((legs, ordinal_codes), mut members))| {
                members.sort_unstable();
                let leg_ids = legs
                    .iter()
                    .map(|leg| {
                        if ordinal_codes {
                            leg.scoped_id(&group)
                        } else {
                            leg.id()
                        }
                    })
                    .collect();
                Dispersion {
                    id: CourseId(format!("{group}#{}", i + 1)),
                    legs,
                    leg_ids,
                    ordinal_codes,
                    members,
                }
            })
            .collect()
    }
}
