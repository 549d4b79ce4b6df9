//! # Engine Module
//!
//! The command processor over both aggregates. Every mutation follows the
//! same shape:
//!
//! 1. load the aggregates the command touches,
//! 2. guard — authority first, then state, then preconditions,
//! 3. mutate the aggregate in memory,
//! 4. one store write,
//! 5. emit a domain event, fire-and-forget.
//!
//! A failed guard writes nothing, so an aggregate is never left partially
//! updated. Cross-aggregate preconditions ("the group is approved", "a
//! scheduled defense exists") are read-then-act checks, not transactions;
//! the store is the unit of consistency per aggregate.
//!
//! ## Storage Backends
//!
//! The engine supports two roster backends:
//! - `InMemory`: a `MemoryRoster` (fast, volatile unless explicitly exported)
//! - `Persistent`: a `RedbRoster` for disk-backed ACID storage

use crate::access::{self, Visibility};
use crate::events::{DomainEvent, Notifier, NullNotifier};
use crate::group::Group;
use crate::limits::{MAX_KEYWORDS, MAX_TEXT_LENGTH, MAX_TITLE_LENGTH, MAX_TOPICS};
use crate::protocol::{self, ReviewContext};
use crate::roster::{MemoryRoster, Roster, RosterCounts, RosterSnapshot};
use crate::schedule::Schedule;
use crate::status::DefenseStage;
use crate::storage::RedbRoster;
use crate::thesis::Thesis;
use crate::transitions::{self, ThesisAction};
use crate::types::{GradusError, GroupId, Precondition, Role, ScheduleId, Subject, ThesisId, User, UserId};
use std::collections::BTreeSet;
use std::path::Path;

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// Roster backend for an Engine.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory roster (fast, volatile).
    InMemory(MemoryRoster),
    /// Disk-backed roster using redb (ACID, persistent).
    Persistent(RedbRoster),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryRoster::new())
    }
}

impl StorageBackend {
    fn roster(&self) -> &dyn Roster {
        match self {
            StorageBackend::InMemory(roster) => roster,
            StorageBackend::Persistent(roster) => roster,
        }
    }

    fn roster_mut(&mut self) -> &mut dyn Roster {
        match self {
            StorageBackend::InMemory(roster) => roster,
            StorageBackend::Persistent(roster) => roster,
        }
    }
}

// =============================================================================
// REVIEW DISPOSITIONS & LIST PARTITIONS
// =============================================================================

/// The three outcomes a reviewer can choose.
///
/// Which outcomes are actually available depends on the thesis status: the
/// transition table rejects undefined combinations as `InvalidTransition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDisposition {
    /// Advance the thesis.
    Approve,
    /// Reject it (topic stage for advisers, defended stages for panels).
    Reject,
    /// Send it back for revisions.
    RequestRevision,
}

/// Groups a user may see, split by relationship.
#[derive(Debug, Clone, Default)]
pub struct GroupPartition {
    /// Groups the user is related to.
    pub mine: Vec<Group>,
    /// Unrelated groups. Populated for admins only.
    pub others: Vec<Group>,
}

/// Theses a user may see, split by relationship.
#[derive(Debug, Clone, Default)]
pub struct ThesisPartition {
    /// Theses the user is related to.
    pub mine: Vec<Thesis>,
    /// Unrelated theses. Populated for admins only.
    pub others: Vec<Thesis>,
}

// =============================================================================
// INPUT VALIDATION
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> Result<(), GradusError> {
    if value.is_empty() {
        return Err(GradusError::InvalidInput(format!("{} is empty", field)));
    }
    if value.len() > max {
        return Err(GradusError::InvalidInput(format!(
            "{} length {} exceeds maximum {} bytes",
            field,
            value.len(),
            max
        )));
    }
    Ok(())
}

fn validate_opt_text(field: &str, value: Option<&str>, max: usize) -> Result<(), GradusError> {
    match value {
        Some(value) => validate_text(field, value, max),
        None => Ok(()),
    }
}

fn validate_list(field: &str, values: &[String], max_items: usize) -> Result<(), GradusError> {
    if values.len() > max_items {
        return Err(GradusError::InvalidInput(format!(
            "{} count {} exceeds maximum {}",
            field,
            values.len(),
            max_items
        )));
    }
    for value in values {
        validate_text(field, value, MAX_TITLE_LENGTH)?;
    }
    Ok(())
}

// =============================================================================
// ENGINE
// =============================================================================

/// The lifecycle engine: roster storage plus the review protocol.
pub struct Engine {
    /// The storage backend (in-memory or persistent).
    backend: StorageBackend,
    /// The notification collaborator. Never awaited, never fails a command.
    notifier: Box<dyn Notifier>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine over a fresh in-memory roster.
    ///
    /// Validates the compiled transition table; an inconsistent table is a
    /// build defect surfaced at startup, not at first use.
    pub fn new() -> Result<Self, GradusError> {
        Self::with_backend(StorageBackend::default())
    }

    /// Create an engine over an explicit backend.
    pub fn with_backend(backend: StorageBackend) -> Result<Self, GradusError> {
        transitions::validate_table()?;
        Ok(Self {
            backend,
            notifier: Box::new(NullNotifier),
        })
    }

    /// Create an engine with persistent redb storage at the given path.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, GradusError> {
        Self::with_backend(StorageBackend::Persistent(RedbRoster::open(path)?))
    }

    /// Attach a notification collaborator.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Persistent(_))
    }

    fn notify(&self, event: DomainEvent) {
        self.notifier.notify(&event);
    }

    // =========================================================================
    // LOAD HELPERS
    // =========================================================================

    fn require_user(&self, id: UserId) -> Result<User, GradusError> {
        self.backend
            .roster()
            .user(id)?
            .ok_or(GradusError::NotFound(Subject::User(id)))
    }

    fn require_group(&self, id: GroupId) -> Result<Group, GradusError> {
        self.backend
            .roster()
            .group(id)?
            .ok_or(GradusError::NotFound(Subject::Group(id)))
    }

    fn require_thesis(&self, id: ThesisId) -> Result<Thesis, GradusError> {
        self.backend
            .roster()
            .thesis(id)?
            .ok_or(GradusError::NotFound(Subject::Thesis(id)))
    }

    fn require_schedule(&self, id: ScheduleId) -> Result<Schedule, GradusError> {
        self.backend
            .roster()
            .schedule(id)?
            .ok_or(GradusError::NotFound(Subject::Schedule(id)))
    }

    /// Load an actor and require an active admin, for admin-only commands.
    fn require_admin(
        &self,
        actor: UserId,
        action: &'static str,
        subject: Subject,
        status: &str,
    ) -> Result<User, GradusError> {
        let user = self.require_user(actor)?;
        if user.is_active_with_role(Role::Admin) {
            Ok(user)
        } else {
            Err(GradusError::Forbidden {
                actor,
                action,
                subject,
                status: status.to_string(),
            })
        }
    }

    /// Require a target user to be an active holder of `role`.
    fn require_role(
        &self,
        target: UserId,
        role: Role,
        action: &'static str,
        subject: Subject,
        status: &str,
    ) -> Result<User, GradusError> {
        let user = self.require_user(target)?;
        let reason = if !user.active {
            Some(Precondition::InactiveUser(target))
        } else if user.role != role {
            Some(Precondition::RoleMismatch {
                user: target,
                expected: role,
            })
        } else {
            None
        };
        match reason {
            Some(reason) => Err(GradusError::PreconditionFailed {
                action,
                subject,
                status: status.to_string(),
                reason,
            }),
            None => Ok(user),
        }
    }

    // =========================================================================
    // USER DIRECTORY
    // =========================================================================

    /// Register a user in the directory.
    ///
    /// Bootstrap rule: the very first registration needs no actor (it seeds
    /// the admin); afterwards only an active admin may register. Real
    /// authentication lives outside the engine.
    pub fn register_user(
        &mut self,
        actor: Option<UserId>,
        name: &str,
        role: Role,
    ) -> Result<User, GradusError> {
        validate_text("name", name, MAX_TITLE_LENGTH)?;

        let directory_empty = self.backend.roster().counts()?.users == 0;
        if !directory_empty {
            let Some(actor) = actor else {
                return Err(GradusError::InvalidInput(
                    "actor_id is required once the directory is non-empty".to_string(),
                ));
            };
            self.require_admin(actor, "register_user", Subject::User(actor), "active")?;
        }

        let id = self.backend.roster_mut().allocate_user_id()?;
        let user = User::new(id, name, role);
        self.backend.roster_mut().put_user(&user)?;
        Ok(user)
    }

    /// Deactivate a user. Admin-only; the record stays for history.
    pub fn deactivate_user(&mut self, actor: UserId, target: UserId) -> Result<User, GradusError> {
        self.require_admin(actor, "deactivate_user", Subject::User(target), "active")?;
        let mut user = self.require_user(target)?;
        user.active = false;
        self.backend.roster_mut().put_user(&user)?;
        Ok(user)
    }

    /// List the directory. Admin-only.
    pub fn users(&self, actor: UserId) -> Result<Vec<User>, GradusError> {
        self.require_admin(actor, "list_users", Subject::User(actor), "active")?;
        self.backend.roster().users()
    }

    // =========================================================================
    // GROUP COMMANDS
    // =========================================================================

    /// Create a group with the actor as leader, in `Pending`.
    pub fn create_group(
        &mut self,
        actor: UserId,
        name: &str,
        member_ids: &[UserId],
        possible_topics: Vec<String>,
        preferred_adviser: Option<UserId>,
    ) -> Result<Group, GradusError> {
        validate_text("name", name, MAX_TITLE_LENGTH)?;
        validate_list("possible_topics", &possible_topics, MAX_TOPICS)?;

        self.require_role(actor, Role::Student, "create", Subject::User(actor), "active")?;
        let mut members: BTreeSet<UserId> = member_ids.iter().copied().collect();
        members.insert(actor);
        for member in &members {
            self.require_role(
                *member,
                Role::Student,
                "create",
                Subject::User(*member),
                "active",
            )?;
        }
        if let Some(preferred) = preferred_adviser {
            self.require_role(
                preferred,
                Role::Adviser,
                "create",
                Subject::User(preferred),
                "active",
            )?;
        }

        // One pending-or-approved group per student, leader included.
        for group in self.backend.roster().groups()? {
            if !group.status.occupies_member() {
                continue;
            }
            if let Some(member) = members.iter().find(|m| group.is_member(**m)) {
                return Err(GradusError::PreconditionFailed {
                    action: "create",
                    subject: Subject::Group(group.id),
                    status: group.status.to_string(),
                    reason: Precondition::AlreadyInGroup(*member),
                });
            }
        }

        let id = self.backend.roster_mut().allocate_group_id()?;
        let group = Group::create(id, name, actor, members, possible_topics, preferred_adviser)?;
        self.backend.roster_mut().put_group(&group)?;
        Ok(group)
    }

    /// Edit a pending or rejected group. Leader-only.
    pub fn update_group(
        &mut self,
        actor: UserId,
        group_id: GroupId,
        name: Option<String>,
        possible_topics: Option<Vec<String>>,
        preferred_adviser: Option<UserId>,
    ) -> Result<Group, GradusError> {
        validate_opt_text("name", name.as_deref(), MAX_TITLE_LENGTH)?;
        if let Some(topics) = &possible_topics {
            validate_list("possible_topics", topics, MAX_TOPICS)?;
        }

        let mut group = self.require_group(group_id)?;
        self.require_leader(actor, &group, "update")?;
        if let Some(preferred) = preferred_adviser {
            self.require_role(
                preferred,
                Role::Adviser,
                "update",
                Subject::Group(group_id),
                group.status.name(),
            )?;
        }
        group.update_details(name, possible_topics, preferred_adviser)?;
        self.backend.roster_mut().put_group(&group)?;
        Ok(group)
    }

    fn require_leader(
        &self,
        actor: UserId,
        group: &Group,
        action: &'static str,
    ) -> Result<User, GradusError> {
        let user = self.require_user(actor)?;
        if user.active && group.leader == actor {
            Ok(user)
        } else {
            Err(GradusError::Forbidden {
                actor,
                action,
                subject: Subject::Group(group.id),
                status: group.status.to_string(),
            })
        }
    }

    /// Approve a pending group. Admin-only; requires an assigned adviser.
    pub fn approve_group(&mut self, actor: UserId, group_id: GroupId) -> Result<Group, GradusError> {
        let mut group = self.require_group(group_id)?;
        self.require_admin(
            actor,
            "approve",
            Subject::Group(group_id),
            group.status.name(),
        )?;
        let old = group.status;
        group.approve()?;
        self.backend.roster_mut().put_group(&group)?;
        self.notify(DomainEvent::GroupStatusChanged {
            actor,
            group: group_id,
            old,
            new: group.status,
        });
        Ok(group)
    }

    /// Reject a pending group. Admin-only.
    pub fn reject_group(
        &mut self,
        actor: UserId,
        group_id: GroupId,
        reason: Option<String>,
    ) -> Result<Group, GradusError> {
        validate_opt_text("reason", reason.as_deref(), MAX_TEXT_LENGTH)?;
        let mut group = self.require_group(group_id)?;
        self.require_admin(
            actor,
            "reject",
            Subject::Group(group_id),
            group.status.name(),
        )?;
        let old = group.status;
        group.reject(reason)?;
        self.backend.roster_mut().put_group(&group)?;
        self.notify(DomainEvent::GroupStatusChanged {
            actor,
            group: group_id,
            old,
            new: group.status,
        });
        Ok(group)
    }

    /// Resubmit a rejected group. Leader-only, no cool-down.
    pub fn resubmit_group(
        &mut self,
        actor: UserId,
        group_id: GroupId,
    ) -> Result<Group, GradusError> {
        let mut group = self.require_group(group_id)?;
        self.require_leader(actor, &group, "resubmit")?;
        let old = group.status;
        group.resubmit()?;
        self.backend.roster_mut().put_group(&group)?;
        self.notify(DomainEvent::GroupStatusChanged {
            actor,
            group: group_id,
            old,
            new: group.status,
        });
        Ok(group)
    }

    /// Assign or replace a group's adviser. Admin-only.
    pub fn assign_adviser(
        &mut self,
        actor: UserId,
        group_id: GroupId,
        adviser: UserId,
    ) -> Result<Group, GradusError> {
        let mut group = self.require_group(group_id)?;
        self.require_admin(
            actor,
            "assign_adviser",
            Subject::Group(group_id),
            group.status.name(),
        )?;
        self.require_role(
            adviser,
            Role::Adviser,
            "assign_adviser",
            Subject::Group(group_id),
            group.status.name(),
        )?;
        group.set_adviser(adviser)?;
        self.backend.roster_mut().put_group(&group)?;
        self.notify(DomainEvent::AdviserAssigned {
            actor,
            group: group_id,
            adviser,
        });
        Ok(group)
    }

    /// Replace a group's panel set. Admin or the group's own adviser.
    pub fn assign_panel(
        &mut self,
        actor: UserId,
        group_id: GroupId,
        panel_ids: &[UserId],
    ) -> Result<Group, GradusError> {
        let mut group = self.require_group(group_id)?;
        let user = self.require_user(actor)?;
        let permitted = user.active
            && (user.role == Role::Admin || group.is_adviser(actor));
        if !permitted {
            return Err(GradusError::Forbidden {
                actor,
                action: "assign_panel",
                subject: Subject::Group(group_id),
                status: group.status.to_string(),
            });
        }
        let panels: BTreeSet<UserId> = panel_ids.iter().copied().collect();
        for panel in &panels {
            self.require_role(
                *panel,
                Role::Panel,
                "assign_panel",
                Subject::Group(group_id),
                group.status.name(),
            )?;
        }
        group.set_panels(panels.clone())?;
        self.backend.roster_mut().put_group(&group)?;
        self.notify(DomainEvent::PanelAssigned {
            actor,
            group: group_id,
            panels: panels.into_iter().collect(),
        });
        Ok(group)
    }

    /// Remove a non-leader member: self-removal, or admin removal.
    pub fn remove_member(
        &mut self,
        actor: UserId,
        group_id: GroupId,
        member: UserId,
    ) -> Result<Group, GradusError> {
        let mut group = self.require_group(group_id)?;
        let user = self.require_user(actor)?;
        let permitted = user.active && (actor == member || user.role == Role::Admin);
        if !permitted {
            return Err(GradusError::Forbidden {
                actor,
                action: "remove_member",
                subject: Subject::Group(group_id),
                status: group.status.to_string(),
            });
        }
        group.remove_member(member)?;
        self.backend.roster_mut().put_group(&group)?;
        Ok(group)
    }

    /// Delete a group. Leader or admin; refused while an active thesis
    /// still points at it.
    pub fn delete_group(&mut self, actor: UserId, group_id: GroupId) -> Result<(), GradusError> {
        let group = self.require_group(group_id)?;
        let user = self.require_user(actor)?;
        let permitted = user.active && (group.leader == actor || user.role == Role::Admin);
        if !permitted {
            return Err(GradusError::Forbidden {
                actor,
                action: "delete",
                subject: Subject::Group(group_id),
                status: group.status.to_string(),
            });
        }
        if let Some(thesis) = self
            .backend
            .roster()
            .theses()?
            .into_iter()
            .find(|t| t.group == group_id && t.status.is_active())
        {
            return Err(GradusError::PreconditionFailed {
                action: "delete",
                subject: Subject::Group(group_id),
                status: group.status.to_string(),
                reason: Precondition::ActiveThesisForGroup(thesis.id),
            });
        }
        self.backend.roster_mut().remove_group(group_id)?;
        Ok(())
    }

    // =========================================================================
    // THESIS COMMANDS
    // =========================================================================

    /// Create a thesis in `Draft` for an approved group.
    pub fn create_thesis(
        &mut self,
        actor: UserId,
        group_id: GroupId,
        title: &str,
        abstract_text: &str,
        keywords: Vec<String>,
    ) -> Result<Thesis, GradusError> {
        validate_text("title", title, MAX_TITLE_LENGTH)?;
        validate_text("abstract", abstract_text, MAX_TEXT_LENGTH)?;
        validate_list("keywords", &keywords, MAX_KEYWORDS)?;

        let group = self.require_group(group_id)?;
        let user = self.require_user(actor)?;
        if !user.active || !group.is_member(actor) {
            return Err(GradusError::Forbidden {
                actor,
                action: "create_thesis",
                subject: Subject::Group(group_id),
                status: group.status.to_string(),
            });
        }
        if !matches!(group.status, crate::status::GroupStatus::Approved) {
            return Err(GradusError::PreconditionFailed {
                action: "create_thesis",
                subject: Subject::Group(group_id),
                status: group.status.to_string(),
                reason: Precondition::GroupNotApproved,
            });
        }
        if let Some(existing) = self
            .backend
            .roster()
            .theses()?
            .into_iter()
            .find(|t| t.group == group_id && t.status.is_active())
        {
            return Err(GradusError::PreconditionFailed {
                action: "create_thesis",
                subject: Subject::Group(group_id),
                status: group.status.to_string(),
                reason: Precondition::ActiveThesisExists(existing.id),
            });
        }

        let id = self.backend.roster_mut().allocate_thesis_id()?;
        let thesis = Thesis::create(id, title, abstract_text, keywords, group_id, actor);
        self.backend.roster_mut().put_thesis(&thesis)?;
        Ok(thesis)
    }

    /// The shared transition path: authorize against the table, apply,
    /// run `annotate` on the mutated aggregate, store once, emit once.
    fn drive_thesis(
        &mut self,
        actor_id: UserId,
        thesis_id: ThesisId,
        action: ThesisAction,
        annotate: impl FnOnce(&mut Thesis),
    ) -> Result<Thesis, GradusError> {
        let actor = self.require_user(actor_id)?;
        let mut thesis = self.require_thesis(thesis_id)?;
        let group = self.require_group(thesis.group)?;

        let rule = transitions::find_transition(thesis.status, action).ok_or_else(|| {
            GradusError::InvalidTransition {
                action: action.verb(),
                subject: Subject::Thesis(thesis_id),
                status: thesis.status.to_string(),
            }
        })?;

        // The schedule precondition read happens only for rules inside a
        // defense band; everything else skips the lookup.
        let schedule = match rule.from.defense_stage() {
            Some(stage) => self.backend.roster().schedule_for(thesis_id, stage)?,
            None => None,
        };

        protocol::authorize(
            &actor,
            rule,
            &ReviewContext {
                thesis: &thesis,
                group: &group,
                schedule: schedule.as_ref(),
            },
        )?;

        let old = thesis.status;
        thesis.apply(action)?;
        annotate(&mut thesis);
        self.backend.roster_mut().put_thesis(&thesis)?;
        self.notify(DomainEvent::ThesisStatusChanged {
            actor: actor_id,
            thesis: thesis_id,
            old,
            new: thesis.status,
        });
        Ok(thesis)
    }

    /// Submit the current stage's work. Proposer-only.
    pub fn submit(&mut self, actor: UserId, thesis: ThesisId) -> Result<Thesis, GradusError> {
        self.drive_thesis(actor, thesis, ThesisAction::Submit, |_| {})
    }

    /// Resubmit after revisions were required. Proposer-only.
    pub fn resubmit(&mut self, actor: UserId, thesis: ThesisId) -> Result<Thesis, GradusError> {
        self.drive_thesis(actor, thesis, ThesisAction::Resubmit, |_| {})
    }

    /// Adviser disposition over a submission.
    pub fn adviser_review(
        &mut self,
        actor: UserId,
        thesis: ThesisId,
        disposition: ReviewDisposition,
        feedback: Option<String>,
    ) -> Result<Thesis, GradusError> {
        validate_opt_text("feedback", feedback.as_deref(), MAX_TEXT_LENGTH)?;
        let action = match disposition {
            ReviewDisposition::Approve => ThesisAction::AdviserApprove,
            ReviewDisposition::Reject => ThesisAction::AdviserReject,
            ReviewDisposition::RequestRevision => ThesisAction::AdviserRequestRevision,
        };
        self.drive_thesis(actor, thesis, action, |t| {
            if disposition == ReviewDisposition::Reject {
                t.record_rejection(feedback.clone());
            }
            t.record_adviser_feedback(feedback);
        })
    }

    /// Panel disposition over a defended stage.
    pub fn panel_review(
        &mut self,
        actor: UserId,
        thesis: ThesisId,
        disposition: ReviewDisposition,
        feedback: Option<String>,
    ) -> Result<Thesis, GradusError> {
        validate_opt_text("feedback", feedback.as_deref(), MAX_TEXT_LENGTH)?;
        let action = match disposition {
            ReviewDisposition::Approve => ThesisAction::PanelApprove,
            ReviewDisposition::Reject => ThesisAction::PanelReject,
            ReviewDisposition::RequestRevision => ThesisAction::PanelRequestRevision,
        };
        self.drive_thesis(actor, thesis, action, |t| {
            if disposition == ReviewDisposition::Reject {
                t.record_rejection(feedback.clone());
            }
            t.record_panel_feedback(feedback);
        })
    }

    /// Record that the defense slot is on the calendar. Adviser or admin.
    pub fn schedule_defense(
        &mut self,
        actor: UserId,
        thesis: ThesisId,
    ) -> Result<Thesis, GradusError> {
        self.drive_thesis(actor, thesis, ThesisAction::ScheduleDefense, |_| {})
    }

    /// Record the defense as held. Panel named on the schedule.
    pub fn conclude_defense(
        &mut self,
        actor: UserId,
        thesis: ThesisId,
    ) -> Result<Thesis, GradusError> {
        self.drive_thesis(actor, thesis, ThesisAction::ConcludeDefense, |_| {})
    }

    /// Declare research underway after proposal approval. Proposer-only.
    pub fn begin_research(
        &mut self,
        actor: UserId,
        thesis: ThesisId,
    ) -> Result<Thesis, GradusError> {
        self.drive_thesis(actor, thesis, ThesisAction::BeginResearch, |_| {})
    }

    /// Archive a fully approved thesis. Admin-only, one-way.
    pub fn archive(&mut self, actor: UserId, thesis: ThesisId) -> Result<Thesis, GradusError> {
        self.drive_thesis(actor, thesis, ThesisAction::Archive, |_| {})
    }

    // =========================================================================
    // SCHEDULE COMMANDS
    // =========================================================================

    /// Record a defense slot for a thesis stage. Adviser or admin.
    ///
    /// When `stage` is omitted the thesis' current defense band is used.
    /// The record is created directly in `Scheduled`; the calendar layer
    /// owns the slot format and any availability search.
    pub fn create_schedule(
        &mut self,
        actor: UserId,
        thesis_id: ThesisId,
        stage: Option<DefenseStage>,
        slot: &str,
        location: &str,
        panel_ids: &[UserId],
    ) -> Result<Schedule, GradusError> {
        validate_text("slot", slot, MAX_TITLE_LENGTH)?;
        validate_text("location", location, MAX_TITLE_LENGTH)?;

        let thesis = self.require_thesis(thesis_id)?;
        let group = self.require_group(thesis.group)?;
        let user = self.require_user(actor)?;
        let permitted = user.active && (user.role == Role::Admin || group.is_adviser(actor));
        if !permitted {
            return Err(GradusError::Forbidden {
                actor,
                action: "create_schedule",
                subject: Subject::Thesis(thesis_id),
                status: thesis.status.to_string(),
            });
        }

        let Some(stage) = stage.or_else(|| thesis.status.defense_stage()) else {
            return Err(GradusError::InvalidInput(format!(
                "stage is required: thesis is in status {}",
                thesis.status
            )));
        };

        let panels: BTreeSet<UserId> = panel_ids.iter().copied().collect();
        for panel in &panels {
            self.require_role(
                *panel,
                Role::Panel,
                "create_schedule",
                Subject::Thesis(thesis_id),
                thesis.status.name(),
            )?;
        }

        let id = self.backend.roster_mut().allocate_schedule_id()?;
        let schedule = Schedule::create(id, thesis_id, stage, slot, location, panels);
        self.backend.roster_mut().put_schedule(&schedule)?;
        Ok(schedule)
    }

    /// Move a schedule record to a new calendar status. Adviser or admin.
    pub fn set_schedule_status(
        &mut self,
        actor: UserId,
        schedule_id: ScheduleId,
        status: crate::status::ScheduleStatus,
    ) -> Result<Schedule, GradusError> {
        let mut schedule = self.require_schedule(schedule_id)?;
        let thesis = self.require_thesis(schedule.thesis)?;
        let group = self.require_group(thesis.group)?;
        let user = self.require_user(actor)?;
        let permitted = user.active && (user.role == Role::Admin || group.is_adviser(actor));
        if !permitted {
            return Err(GradusError::Forbidden {
                actor,
                action: "set_schedule_status",
                subject: Subject::Schedule(schedule_id),
                status: schedule.status.to_string(),
            });
        }
        schedule.set_status(status)?;
        self.backend.roster_mut().put_schedule(&schedule)?;
        Ok(schedule)
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Load a group the actor may view.
    pub fn group_view(&self, actor: UserId, group_id: GroupId) -> Result<Group, GradusError> {
        let group = self.require_group(group_id)?;
        let user = self.require_user(actor)?;
        if access::can_view_group(&user, &group) {
            Ok(group)
        } else {
            Err(GradusError::Forbidden {
                actor,
                action: "view",
                subject: Subject::Group(group_id),
                status: group.status.to_string(),
            })
        }
    }

    /// Load a thesis the actor may view.
    ///
    /// Tolerates a deleted owning group: the proposer relation (and admin)
    /// still sees the historical record.
    pub fn thesis_view(&self, actor: UserId, thesis_id: ThesisId) -> Result<Thesis, GradusError> {
        let thesis = self.require_thesis(thesis_id)?;
        let user = self.require_user(actor)?;
        let visible = match self.backend.roster().group(thesis.group)? {
            Some(group) => access::can_view_thesis(&user, &thesis, &group),
            None => user.role == Role::Admin || thesis.proposer == actor,
        };
        if visible {
            Ok(thesis)
        } else {
            Err(GradusError::Forbidden {
                actor,
                action: "view",
                subject: Subject::Thesis(thesis_id),
                status: thesis.status.to_string(),
            })
        }
    }

    /// Partition all groups for the actor. The predicate runs per item.
    pub fn visible_groups(&self, actor: UserId) -> Result<GroupPartition, GradusError> {
        let user = self.require_user(actor)?;
        let mut partition = GroupPartition::default();
        for group in self.backend.roster().groups()? {
            match access::classify_group(&user, &group) {
                Visibility::Mine => partition.mine.push(group),
                Visibility::Other if user.role == Role::Admin => partition.others.push(group),
                Visibility::Other => {}
            }
        }
        Ok(partition)
    }

    /// Partition all theses for the actor. The predicate runs per item.
    pub fn visible_theses(&self, actor: UserId) -> Result<ThesisPartition, GradusError> {
        let user = self.require_user(actor)?;
        let mut partition = ThesisPartition::default();
        for thesis in self.backend.roster().theses()? {
            let visibility = match self.backend.roster().group(thesis.group)? {
                Some(group) => access::classify_thesis(&user, &thesis, &group),
                None if thesis.proposer == actor => Visibility::Mine,
                None => Visibility::Other,
            };
            match visibility {
                Visibility::Mine => partition.mine.push(thesis),
                Visibility::Other if user.role == Role::Admin => partition.others.push(thesis),
                Visibility::Other => {}
            }
        }
        Ok(partition)
    }

    /// Aggregate counts for status reporting.
    pub fn counts(&self) -> Result<RosterCounts, GradusError> {
        self.backend.roster().counts()
    }

    /// Export the full roster as plain data.
    pub fn export(&self) -> Result<RosterSnapshot, GradusError> {
        self.backend.roster().export()
    }

    /// Replace the full roster with a snapshot.
    pub fn import(&mut self, snapshot: RosterSnapshot) -> Result<(), GradusError> {
        self.backend.roster_mut().import(snapshot)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{GroupStatus, ScheduleStatus, ThesisStatus};

    /// A roster with one of everything, far enough along for thesis work.
    struct World {
        engine: Engine,
        admin: UserId,
        leader: UserId,
        member: UserId,
        adviser: UserId,
        panel_a: UserId,
        panel_b: UserId,
        group: GroupId,
    }

    fn world() -> World {
        let mut engine = Engine::new().expect("engine");
        let admin = engine
            .register_user(None, "Root", Role::Admin)
            .expect("admin")
            .id;
        let leader = engine
            .register_user(Some(admin), "Lena", Role::Student)
            .expect("leader")
            .id;
        let member = engine
            .register_user(Some(admin), "Milo", Role::Student)
            .expect("member")
            .id;
        let adviser = engine
            .register_user(Some(admin), "Asha", Role::Adviser)
            .expect("adviser")
            .id;
        let panel_a = engine
            .register_user(Some(admin), "Pia", Role::Panel)
            .expect("panel")
            .id;
        let panel_b = engine
            .register_user(Some(admin), "Paul", Role::Panel)
            .expect("panel")
            .id;

        let group = engine
            .create_group(leader, "Systems", &[member], vec![], None)
            .expect("group")
            .id;
        engine.assign_adviser(admin, group, adviser).expect("adviser");
        engine.approve_group(admin, group).expect("approve");
        engine
            .assign_panel(admin, group, &[panel_a, panel_b])
            .expect("panel");

        World {
            engine,
            admin,
            leader,
            member,
            adviser,
            panel_a,
            panel_b,
            group,
        }
    }

    #[test]
    fn bootstrap_then_admin_gated_registration() {
        let mut engine = Engine::new().expect("engine");
        let first = engine.register_user(None, "Root", Role::Admin).expect("boot");
        // Second ungated registration is refused.
        assert!(engine.register_user(None, "Eve", Role::Admin).is_err());
        // Non-admin actors are refused.
        let student = engine
            .register_user(Some(first.id), "Stu", Role::Student)
            .expect("student");
        assert!(matches!(
            engine.register_user(Some(student.id), "Eve", Role::Student),
            Err(GradusError::Forbidden { .. })
        ));
    }

    #[test]
    fn group_approval_needs_adviser_first() {
        let mut engine = Engine::new().expect("engine");
        let admin = engine
            .register_user(None, "Root", Role::Admin)
            .expect("admin")
            .id;
        let s1 = engine
            .register_user(Some(admin), "S1", Role::Student)
            .expect("s1")
            .id;
        let s2 = engine
            .register_user(Some(admin), "S2", Role::Student)
            .expect("s2")
            .id;
        let adviser = engine
            .register_user(Some(admin), "A", Role::Adviser)
            .expect("a")
            .id;

        let group = engine
            .create_group(s1, "Pair", &[s2], vec![], None)
            .expect("group");
        assert_eq!(group.status, GroupStatus::Pending);

        let err = engine.approve_group(admin, group.id).expect_err("no adviser");
        assert!(matches!(
            err,
            GradusError::PreconditionFailed {
                reason: Precondition::AdviserRequired,
                ..
            }
        ));

        engine.assign_adviser(admin, group.id, adviser).expect("assign");
        let group = engine.approve_group(admin, group.id).expect("approve");
        assert_eq!(group.status, GroupStatus::Approved);
    }

    #[test]
    fn second_concurrent_group_is_refused() {
        let mut w = world();
        let err = w
            .engine
            .create_group(w.leader, "Again", &[], vec![], None)
            .expect_err("already in a group");
        assert!(matches!(
            err,
            GradusError::PreconditionFailed {
                reason: Precondition::AlreadyInGroup(_),
                ..
            }
        ));

        // A rejected group frees its members.
        let mut engine = Engine::new().expect("engine");
        let admin = engine
            .register_user(None, "Root", Role::Admin)
            .expect("admin")
            .id;
        let s = engine
            .register_user(Some(admin), "S", Role::Student)
            .expect("s")
            .id;
        let g1 = engine
            .create_group(s, "One", &[], vec![], None)
            .expect("g1")
            .id;
        engine.reject_group(admin, g1, None).expect("reject");
        engine
            .create_group(s, "Two", &[], vec![], None)
            .expect("second group after rejection");
    }

    #[test]
    fn only_students_form_groups() {
        let mut w = world();
        let err = w
            .engine
            .create_group(w.adviser, "Wrong", &[], vec![], None)
            .expect_err("advisers don't form groups");
        assert!(matches!(
            err,
            GradusError::PreconditionFailed {
                reason: Precondition::RoleMismatch { .. },
                ..
            }
        ));
    }

    #[test]
    fn panel_assignment_by_own_adviser_is_self_service() {
        let mut w = world();
        w.engine
            .assign_panel(w.adviser, w.group, &[w.panel_a])
            .expect("adviser assigns own group's panel");

        // A different adviser may not.
        let other = w
            .engine
            .register_user(Some(w.admin), "Oz", Role::Adviser)
            .expect("other")
            .id;
        assert!(matches!(
            w.engine.assign_panel(other, w.group, &[w.panel_a]),
            Err(GradusError::Forbidden { .. })
        ));
    }

    #[test]
    fn non_leader_leaves_leader_cannot() {
        let mut w = world();
        w.engine
            .remove_member(w.member, w.group, w.member)
            .expect("self-removal");
        let err = w
            .engine
            .remove_member(w.leader, w.group, w.leader)
            .expect_err("leader stays");
        assert!(matches!(
            err,
            GradusError::PreconditionFailed {
                reason: Precondition::LeaderCannotLeave,
                ..
            }
        ));
    }

    #[test]
    fn member_cannot_remove_someone_else() {
        let mut w = world();
        assert!(matches!(
            w.engine.remove_member(w.member, w.group, w.leader),
            Err(GradusError::Forbidden { .. })
        ));
    }

    fn drive_to_concept_defended(w: &mut World) -> ThesisId {
        let thesis = w
            .engine
            .create_thesis(w.member, w.group, "Title", "Abstract.", vec![])
            .expect("thesis")
            .id;
        w.engine.submit(w.member, thesis).expect("submit topic");
        w.engine
            .adviser_review(w.adviser, thesis, ReviewDisposition::Approve, None)
            .expect("topic approved");
        w.engine.submit(w.member, thesis).expect("submit concept");
        w.engine
            .adviser_review(w.adviser, thesis, ReviewDisposition::Approve, None)
            .expect("cleared for defense");
        w.engine
            .create_schedule(w.adviser, thesis, None, "2024-11-05T09:00", "Room 2", &[w.panel_a])
            .expect("slot");
        w.engine
            .schedule_defense(w.adviser, thesis)
            .expect("scheduled");
        w.engine
            .conclude_defense(w.panel_a, thesis)
            .expect("defended");
        thesis
    }

    #[test]
    fn full_concept_round_with_revision_loop() {
        let mut w = world();
        let thesis = drive_to_concept_defended(&mut w);

        let t = w
            .engine
            .panel_review(
                w.panel_a,
                thesis,
                ReviewDisposition::RequestRevision,
                Some("add related work".to_string()),
            )
            .expect("revisions");
        assert_eq!(t.status, ThesisStatus::ConceptRevisionsRequired);
        assert_eq!(t.panel_feedback.as_deref(), Some("add related work"));

        let t = w.engine.resubmit(w.member, thesis).expect("resubmit");
        assert_eq!(t.status, ThesisStatus::ConceptSubmitted);
    }

    #[test]
    fn unnamed_panel_member_is_forbidden() {
        let mut w = world();
        let thesis = drive_to_concept_defended(&mut w);

        // panel_b sits on the group but is not named on the schedule.
        let err = w
            .engine
            .panel_review(w.panel_b, thesis, ReviewDisposition::Approve, None)
            .expect_err("unnamed panel");
        assert!(matches!(err, GradusError::Forbidden { .. }));
    }

    #[test]
    fn cancelled_schedule_blocks_panel_action() {
        let mut w = world();
        let thesis = drive_to_concept_defended(&mut w);
        // Cancel the only slot; the panel precondition disappears.
        let slot = w.engine.export().expect("export").schedules[0].clone();
        w.engine
            .set_schedule_status(w.adviser, slot.id, ScheduleStatus::Cancelled)
            .expect("cancel");
        let err = w
            .engine
            .panel_review(w.panel_a, thesis, ReviewDisposition::Approve, None)
            .expect_err("no scheduled slot");
        assert!(matches!(
            err,
            GradusError::PreconditionFailed {
                reason: Precondition::ScheduleMissing(DefenseStage::Concept),
                ..
            }
        ));
    }

    #[test]
    fn topic_rejection_is_terminal_and_frees_the_group() {
        let mut w = world();
        let thesis = w
            .engine
            .create_thesis(w.member, w.group, "Title", "Abstract.", vec![])
            .expect("thesis")
            .id;
        w.engine.submit(w.member, thesis).expect("submit");
        let t = w
            .engine
            .adviser_review(
                w.adviser,
                thesis,
                ReviewDisposition::Reject,
                Some("insufficient scope".to_string()),
            )
            .expect("reject");
        assert_eq!(t.status, ThesisStatus::TopicRejected);
        assert_eq!(t.rejection_reason.as_deref(), Some("insufficient scope"));

        // Resubmission from a terminal status is undefined.
        let err = w.engine.resubmit(w.member, thesis).expect_err("terminal");
        assert!(matches!(err, GradusError::InvalidTransition { .. }));

        // The slot is free: a new thesis can be proposed.
        w.engine
            .create_thesis(w.member, w.group, "Second Try", "Abstract.", vec![])
            .expect("new thesis");
    }

    #[test]
    fn one_active_thesis_per_group() {
        let mut w = world();
        w.engine
            .create_thesis(w.member, w.group, "First", "Abstract.", vec![])
            .expect("first");
        let err = w
            .engine
            .create_thesis(w.leader, w.group, "Second", "Abstract.", vec![])
            .expect_err("slot taken");
        assert!(matches!(
            err,
            GradusError::PreconditionFailed {
                reason: Precondition::ActiveThesisExists(_),
                ..
            }
        ));
    }

    #[test]
    fn replayed_command_reports_invalid_transition() {
        let mut w = world();
        let thesis = w
            .engine
            .create_thesis(w.member, w.group, "Title", "Abstract.", vec![])
            .expect("thesis")
            .id;
        w.engine.submit(w.member, thesis).expect("submit");
        let err = w.engine.submit(w.member, thesis).expect_err("replay");
        assert!(matches!(err, GradusError::InvalidTransition { .. }));
    }

    #[test]
    fn visibility_partitions_per_actor() {
        let mut w = world();
        let thesis = w
            .engine
            .create_thesis(w.member, w.group, "Title", "Abstract.", vec![])
            .expect("thesis")
            .id;

        // A stranger student sees nothing.
        let stranger = w
            .engine
            .register_user(Some(w.admin), "Sam", Role::Student)
            .expect("stranger")
            .id;
        let partition = w.engine.visible_theses(stranger).expect("partition");
        assert!(partition.mine.is_empty());
        assert!(partition.others.is_empty());
        assert!(matches!(
            w.engine.thesis_view(stranger, thesis),
            Err(GradusError::Forbidden { .. })
        ));

        // Related parties land in `mine`.
        for actor in [w.leader, w.member, w.adviser, w.panel_a] {
            let partition = w.engine.visible_theses(actor).expect("partition");
            assert_eq!(partition.mine.len(), 1, "actor {:?}", actor);
        }

        // Admin sees it as `others`.
        let partition = w.engine.visible_theses(w.admin).expect("partition");
        assert!(partition.mine.is_empty());
        assert_eq!(partition.others.len(), 1);
        w.engine.thesis_view(w.admin, thesis).expect("admin view");
    }

    #[test]
    fn delete_group_blocked_by_active_thesis() {
        let mut w = world();
        w.engine
            .create_thesis(w.member, w.group, "Title", "Abstract.", vec![])
            .expect("thesis");
        let err = w
            .engine
            .delete_group(w.leader, w.group)
            .expect_err("active thesis");
        assert!(matches!(
            err,
            GradusError::PreconditionFailed {
                reason: Precondition::ActiveThesisForGroup(_),
                ..
            }
        ));
    }

    #[test]
    fn events_flow_through_the_notifier() {
        use crate::events::EventLog;
        use std::sync::Arc;

        struct SharedLog(Arc<EventLog>);
        impl Notifier for SharedLog {
            fn notify(&self, event: &DomainEvent) {
                self.0.notify(event);
            }
        }

        let log = Arc::new(EventLog::new());
        let mut engine = Engine::new()
            .expect("engine")
            .with_notifier(Box::new(SharedLog(Arc::clone(&log))));

        let admin = engine
            .register_user(None, "Root", Role::Admin)
            .expect("admin")
            .id;
        let s = engine
            .register_user(Some(admin), "S", Role::Student)
            .expect("s")
            .id;
        let a = engine
            .register_user(Some(admin), "A", Role::Adviser)
            .expect("a")
            .id;
        let group = engine
            .create_group(s, "Solo", &[], vec![], None)
            .expect("group")
            .id;
        engine.assign_adviser(admin, group, a).expect("assign");
        engine.approve_group(admin, group).expect("approve");

        let events = log.drain();
        assert!(matches!(events[0], DomainEvent::AdviserAssigned { .. }));
        assert!(matches!(
            events[1],
            DomainEvent::GroupStatusChanged {
                old: GroupStatus::Pending,
                new: GroupStatus::Approved,
                ..
            }
        ));
    }

    #[test]
    fn redb_backend_persists_across_engines() {
        use tempfile::TempDir;

        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("gradus.db");

        let group_id;
        {
            let mut engine = Engine::with_redb(&path).expect("engine");
            let admin = engine
                .register_user(None, "Root", Role::Admin)
                .expect("admin")
                .id;
            let s = engine
                .register_user(Some(admin), "S", Role::Student)
                .expect("s")
                .id;
            group_id = engine
                .create_group(s, "Durable", &[], vec![], None)
                .expect("group")
                .id;
        }

        let engine = Engine::with_redb(&path).expect("reopen");
        assert!(engine.is_persistent());
        assert_eq!(engine.counts().expect("counts").groups, 1);
        let snapshot = engine.export().expect("export");
        assert_eq!(snapshot.groups[0].id, group_id);
    }
}
