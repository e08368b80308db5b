//! Tenant enumeration, soft-failing loads and the joins every page is built
//! from.
//!
//! The join functions are pure: they take a loaded [`TenantBundle`] and return
//! owned, serializable records. A dangling foreign key never fails a join; the
//! referenced part is simply empty or left out.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, warn};

use crate::models::portfolio::{Image, Position, Project, Skill, SkillTopic, Technology, WorkExperience};
use crate::tenant::bundle::TenantBundle;
use crate::tenant::source::{is_valid_key, SourceError, TenantSource, DEFAULT_TENANT};

/// Shown when a project has no usable thumbnail.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.png";

#[derive(Clone)]
pub struct CompanyDataResolver {
    source: Arc<dyn TenantSource>,
}

impl CompanyDataResolver {
    pub fn new(source: Arc<dyn TenantSource>) -> Self {
        Self { source }
    }

    /// Keys that get their own pages. The reserved default tenant is left out;
    /// it is still loadable through [`load_tenant`](Self::load_tenant).
    pub async fn list_tenants(&self) -> Vec<String> {
        match self.source.tenant_keys().await {
            Ok(keys) => keys.into_iter().filter(|k| k != DEFAULT_TENANT).collect(),
            Err(e) => {
                error!("Failed to enumerate tenants: {e}");
                Vec::new()
            }
        }
    }

    /// `default` when it exists, otherwise the first available key.
    pub async fn default_tenant_key(&self) -> String {
        let keys = self.source.tenant_keys().await.unwrap_or_else(|e| {
            error!("Failed to enumerate tenants: {e}");
            Vec::new()
        });
        if keys.iter().any(|k| k == DEFAULT_TENANT) {
            return DEFAULT_TENANT.to_string();
        }
        keys.into_iter()
            .next()
            .unwrap_or_else(|| DEFAULT_TENANT.to_string())
    }

    /// Loads and indexes one tenant. Unknown keys, malformed datasets and
    /// backend failures all come back as `None`.
    pub async fn load_tenant(&self, key: &str) -> Option<TenantBundle> {
        if !is_valid_key(key) {
            debug!("Rejected tenant key {key:?}");
            return None;
        }
        match self.source.fetch(key).await {
            Ok(Some(dataset)) => Some(TenantBundle::new(key, dataset)),
            Ok(None) => {
                warn!("Company data not found for '{key}'");
                None
            }
            Err(e @ SourceError::Malformed { .. }) => {
                warn!("Error loading company data for '{key}': {e}");
                None
            }
            Err(e) => {
                error!("Error loading company data for '{key}': {e}");
                None
            }
        }
    }
}

// ── Work history ────────────────────────────────────────────────────────────

/// Employer fields flattened for display; all empty when the reference dangles.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct EmployerSummary {
    pub name: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkHistoryEntry {
    pub position: Position,
    pub employer: EmployerSummary,
    pub experiences: Vec<WorkExperience>,
}

/// Positions, most recent start first, each with its employer and its visible
/// work experience entries.
pub fn resolve_work_history(bundle: &TenantBundle) -> Vec<WorkHistoryEntry> {
    let mut positions: Vec<&Position> = bundle.positions().iter().collect();
    // Stable: equal start dates keep dataset order. Undated positions go last.
    positions.sort_by(|a, b| {
        match (a.date_started.as_date(), b.date_started.as_date()) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });

    positions
        .into_iter()
        .map(|position| {
            let employer = bundle
                .employer(position.employer_id.as_deref())
                .map(|e| EmployerSummary {
                    name: e.name.clone(),
                    city: e.city.clone(),
                    state: e.state.clone(),
                })
                .unwrap_or_default();
            let experiences = bundle
                .experiences_for(&position.id)
                .filter(|w| w.is_visible)
                .cloned()
                .collect();
            WorkHistoryEntry {
                position: position.clone(),
                employer,
                experiences,
            }
        })
        .collect()
}

// ── Skills ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SkillGroup {
    pub topic: SkillTopic,
    /// Item descriptions in ascending item order, joined by ", ".
    pub items: String,
}

pub fn resolve_skill_groups(bundle: &TenantBundle) -> Vec<SkillGroup> {
    let mut topics: Vec<&SkillTopic> = bundle.skill_topics().iter().collect();
    topics.sort_by_key(|t| t.order);
    topics
        .into_iter()
        .map(|topic| SkillGroup {
            topic: topic.clone(),
            items: join_descriptions(bundle.items_for(&topic.id).map(|i| i.description.as_str())),
        })
        .collect()
}

/// The ungrouped skill list as one ", "-joined line.
pub fn resolve_flat_skills(bundle: &TenantBundle) -> String {
    let mut skills: Vec<&Skill> = bundle.skills().iter().collect();
    skills.sort_by_key(|s| s.order);
    join_descriptions(skills.into_iter().map(|s| s.description.as_str()))
}

/// Technology names then skill item descriptions, first occurrence wins.
pub fn resolve_highlight_skills(bundle: &TenantBundle) -> Vec<String> {
    let mut seen = HashSet::new();
    bundle
        .technologies()
        .iter()
        .map(|t| t.name.trim())
        .chain(bundle.skill_items().iter().map(|i| i.description.trim()))
        .filter(|s| !s.is_empty() && seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}

fn join_descriptions<'a>(items: impl Iterator<Item = &'a str>) -> String {
    items.collect::<Vec<_>>().join(", ")
}

// ── Projects ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Thumbnail {
    Image(Image),
    Placeholder,
}

impl Thumbnail {
    /// What an `<img src>` should point at.
    pub fn src(&self) -> &str {
        match self {
            Thumbnail::Image(image) => image.source().unwrap_or(PLACEHOLDER_IMAGE),
            Thumbnail::Placeholder => PLACEHOLDER_IMAGE,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProjectCard {
    pub project: Project,
    pub thumbnail: Thumbnail,
    pub images: Vec<Image>,
    pub technologies: Vec<Technology>,
    pub skills: Vec<Skill>,
}

/// Projects by `defaultOrder`, each with its thumbnail, gallery images and the
/// technologies / skills it references.
pub fn resolve_project_gallery(bundle: &TenantBundle) -> Vec<ProjectCard> {
    let mut projects: Vec<&Project> = bundle.projects().iter().collect();
    projects.sort_by_key(|p| p.default_order);
    projects
        .into_iter()
        .map(|project| ProjectCard {
            thumbnail: bundle
                .image(project.image_thumbnail_id.as_deref())
                .cloned()
                .map(Thumbnail::Image)
                .unwrap_or(Thumbnail::Placeholder),
            images: bundle.images_for(&project.id).cloned().collect(),
            technologies: project
                .technology_ids
                .iter()
                .filter_map(|id| bundle.technology(Some(id)))
                .cloned()
                .collect(),
            skills: project
                .skill_ids
                .iter()
                .filter_map(|id| bundle.skill(Some(id)))
                .cloned()
                .collect(),
            project: project.clone(),
        })
        .collect()
}
