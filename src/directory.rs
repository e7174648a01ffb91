//! Per-pass member directory: an id-indexed snapshot of the network.
//!
//! Engines never query storage mid-calculation. Orchestration loads all
//! members once, builds this index, and hands it to the engines, which treat
//! it as read-only. Unknown ids resolve to None, never panic; dangling child
//! or sponsor references are routine after admin deletes.

use std::collections::HashMap;

use crate::domain::{Member, MemberCode, MemberId, Side};

/// Read-only snapshot of all members for one calculation pass.
#[derive(Debug, Clone, Default)]
pub struct MemberDirectory {
    members: HashMap<MemberId, Member>,
}

impl MemberDirectory {
    pub fn new(members: Vec<Member>) -> Self {
        MemberDirectory {
            members: members.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    pub fn get(&self, id: MemberId) -> Option<&Member> {
        self.members.get(&id)
    }

    pub fn get_by_code(&self, code: &MemberCode) -> Option<&Member> {
        self.members.values().find(|m| &m.code == code)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    /// Consume the snapshot into a mutable member map for wallet application.
    pub fn into_members(self) -> HashMap<MemberId, Member> {
        self.members
    }

    /// Child on the given side, if the slot is filled and the id resolves.
    pub fn child(&self, id: MemberId, side: Side) -> Option<&Member> {
        self.get(id)
            .and_then(|m| m.child(side))
            .and_then(|c| self.get(c))
    }

    /// Walk the sponsor chain upward, starting from the immediate sponsor.
    ///
    /// Terminates at the root or at the first dangling sponsor reference.
    /// Bounded by population size since the chain is acyclic.
    pub fn upline(&self, id: MemberId) -> UplineIter<'_> {
        UplineIter {
            directory: self,
            next: self.get(id).and_then(|m| m.sponsor_id),
            remaining: self.members.len(),
        }
    }
}

/// Iterator over a member's upline chain.
pub struct UplineIter<'a> {
    directory: &'a MemberDirectory,
    next: Option<MemberId>,
    /// Hard bound against corrupted (cyclic) sponsor data.
    remaining: usize,
}

impl<'a> Iterator for UplineIter<'a> {
    type Item = &'a Member;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let member = self.directory.get(self.next?)?;
        self.next = member.sponsor_id;
        Some(member)
    }
}
