use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use leadscout_common::{normalize_phone, Lead, LeadSource, LeadStatus, SearchCriteria};

use crate::discovery::RawCandidate;

/// Result of merging a batch into the working set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub added: usize,
    pub duplicates: usize,
}

/// Turn an accepted candidate into a fresh `new` lead.
pub fn admit(candidate: RawCandidate, criteria: &SearchCriteria, now: DateTime<Utc>) -> Lead {
    Lead {
        id: Uuid::new_v4(),
        name: candidate.name.trim().to_string(),
        company: candidate.company.unwrap_or_default().trim().to_string(),
        headline: candidate.headline.filter(|h| !h.trim().is_empty()),
        phone_number: candidate
            .phone_number
            .as_deref()
            .map(normalize_phone)
            .unwrap_or_default(),
        email: candidate.email.filter(|e| !e.trim().is_empty()),
        email_subject: candidate.email_subject.filter(|s| !s.trim().is_empty()),
        localized_pitch: candidate.localized_pitch.unwrap_or_default(),
        integrity: candidate.integrity,
        status: LeadStatus::New,
        created_at: now,
        niche: criteria.niche.clone(),
        country: criteria.country.clone(),
        sources: candidate
            .sources
            .into_iter()
            .map(|s| LeadSource {
                title: s.title.unwrap_or_else(|| s.url.clone()),
                url: s.url,
            })
            .collect(),
    }
}

/// The deduplicated collection of accepted leads.
///
/// No two leads share a canonical phone number. When a number is already
/// present the stored lead wins and the newcomer is dropped.
#[derive(Debug, Default, Clone)]
pub struct WorkingSet {
    leads: Vec<Lead>,
    phones: HashSet<String>,
}

impl WorkingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted leads, re-applying dedup in stored order.
    pub fn from_leads(leads: Vec<Lead>) -> Self {
        let mut set = Self::new();
        set.merge(leads);
        set
    }

    /// Merge a batch with first-seen priority, both against the stored leads
    /// and within the batch itself.
    pub fn merge(&mut self, batch: Vec<Lead>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();
        for mut lead in batch {
            lead.phone_number = normalize_phone(&lead.phone_number);
            if !self.phones.insert(lead.phone_number.clone()) {
                outcome.duplicates += 1;
                continue;
            }
            self.leads.push(lead);
            outcome.added += 1;
        }
        outcome
    }

    pub fn remove(&mut self, id: Uuid) -> Option<Lead> {
        let index = self.leads.iter().position(|l| l.id == id)?;
        let lead = self.leads.remove(index);
        self.phones.remove(&lead.phone_number);
        Some(lead)
    }

    /// Overwrite a lead's status. Returns the previous status, or `None` when
    /// the id is unknown. Lattice checks are the caller's concern.
    pub fn set_status(&mut self, id: Uuid, status: LeadStatus) -> Option<LeadStatus> {
        let lead = self.leads.iter_mut().find(|l| l.id == id)?;
        Some(std::mem::replace(&mut lead.status, status))
    }

    pub fn clear(&mut self) {
        self.leads.clear();
        self.phones.clear();
    }

    pub fn get(&self, id: Uuid) -> Option<&Lead> {
        self.leads.iter().find(|l| l.id == id)
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    pub fn contains_phone(&self, phone: &str) -> bool {
        self.phones.contains(&normalize_phone(phone))
    }

    /// Leads in insertion order, as persisted.
    pub fn as_slice(&self) -> &[Lead] {
        &self.leads
    }

    /// Newest first. `filter` matches name or company case-insensitively, or
    /// a substring of the phone digits. Blank filter returns everything.
    pub fn list(&self, filter: Option<&str>) -> Vec<Lead> {
        let needle = filter.map(str::trim).filter(|f| !f.is_empty());
        let needle_lower = needle.map(str::to_lowercase);

        let mut matched: Vec<Lead> = self
            .leads
            .iter()
            .rev()
            .filter(|lead| match (needle, &needle_lower) {
                (Some(raw), Some(lower)) => {
                    lead.name.to_lowercase().contains(lower.as_str())
                        || lead.company.to_lowercase().contains(lower.as_str())
                        || lead.phone_number.contains(raw)
                }
                _ => true,
            })
            .cloned()
            .collect();
        // Stable sort keeps later insertions first among equal timestamps.
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matched
    }
}
