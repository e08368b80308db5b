//! One company's dataset plus the lookup maps every join uses.
//!
//! All maps are built once in [`TenantBundle::new`]. Resolver code asks the
//! bundle for `employer(id)`, `images_for(project_id)` and so on; nothing
//! downstream scans a collection to follow a reference.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::models::portfolio::{
    Certification, College, Employer, Image, Position, Profile, Project, Skill, SkillItem,
    SkillTopic, Technology, TenantDataset, WorkExperience,
};

#[derive(Debug, Clone)]
pub struct TenantBundle {
    key: String,
    data: TenantDataset,
    employers: HashMap<String, usize>,
    positions: HashMap<String, usize>,
    topics: HashMap<String, usize>,
    projects: HashMap<String, usize>,
    images: HashMap<String, usize>,
    technologies: HashMap<String, usize>,
    skills: HashMap<String, usize>,
    // Children grouped by parent id, already ordered by their sort field.
    experiences_by_position: HashMap<String, Vec<usize>>,
    items_by_topic: HashMap<String, Vec<usize>>,
    images_by_project: HashMap<String, Vec<usize>>,
}

impl TenantBundle {
    pub fn new(key: impl Into<String>, data: TenantDataset) -> Self {
        let key = key.into();
        let bundle = Self {
            employers: index_by_id(&key, "employer", &data.employers, |e| &e.id),
            positions: index_by_id(&key, "position", &data.positions, |p| &p.id),
            topics: index_by_id(&key, "skill topic", &data.skill_topics, |t| &t.id),
            projects: index_by_id(&key, "project", &data.projects, |p| &p.id),
            images: index_by_id(&key, "image", &data.images, |i| &i.id),
            technologies: index_by_id(&key, "technology", &data.technologies, |t| &t.id),
            skills: index_by_id(&key, "skill", &data.skills, |s| &s.id),
            experiences_by_position: group_by_parent(
                &data.work_experiences,
                |w| w.position_id.as_deref(),
                |w| w.order,
            ),
            items_by_topic: group_by_parent(
                &data.skill_items,
                |i| i.skill_topic_id.as_deref(),
                |i| i.order,
            ),
            images_by_project: group_by_parent(
                &data.images,
                |i| i.project_id.as_deref(),
                |i| i.order,
            ),
            key,
            data,
        };
        for dangling in bundle.dangling_references() {
            debug!("Tenant '{}': {dangling}", bundle.key);
        }
        bundle
    }

    /// Every foreign key in the dataset that points at nothing. Joins treat
    /// these as absent; this is only for diagnostics.
    pub fn dangling_references(&self) -> Vec<String> {
        let mut dangling = Vec::new();
        let mut check = |kind: &str, owner: &str, target: &str, resolved: bool| {
            if !resolved {
                dangling.push(format!("{kind} '{owner}' references missing {target}"));
            }
        };

        for p in &self.data.positions {
            if let Some(id) = p.employer_id.as_deref() {
                check("position", &p.id, &format!("employer '{id}'"), self.employer(Some(id)).is_some());
            }
        }
        for w in &self.data.work_experiences {
            if let Some(id) = w.position_id.as_deref() {
                check("work experience", &w.id, &format!("position '{id}'"), self.position(Some(id)).is_some());
            }
        }
        for i in &self.data.skill_items {
            if let Some(id) = i.skill_topic_id.as_deref() {
                check("skill item", &i.id, &format!("topic '{id}'"), self.skill_topic(Some(id)).is_some());
            }
        }
        for i in &self.data.images {
            if let Some(id) = i.project_id.as_deref() {
                check("image", &i.id, &format!("project '{id}'"), self.project(Some(id)).is_some());
            }
        }
        for p in &self.data.projects {
            if let Some(id) = p.image_thumbnail_id.as_deref() {
                check("project", &p.id, &format!("thumbnail '{id}'"), self.image(Some(id)).is_some());
            }
            for id in &p.technology_ids {
                check("project", &p.id, &format!("technology '{id}'"), self.technology(Some(id)).is_some());
            }
            for id in &p.skill_ids {
                check("project", &p.id, &format!("skill '{id}'"), self.skill(Some(id)).is_some());
            }
        }
        dangling
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Display name of the company, falling back to the tenant key.
    pub fn company_name(&self) -> &str {
        self.data
            .company_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.key)
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.data.user_profile.as_ref()
    }

    /// The resume template, if present and not blank.
    pub fn template(&self) -> Option<&str> {
        self.data
            .resume_template
            .as_deref()
            .filter(|t| !t.trim().is_empty())
    }

    pub fn dataset(&self) -> &TenantDataset {
        &self.data
    }

    pub fn positions(&self) -> &[Position] {
        &self.data.positions
    }

    pub fn colleges(&self) -> &[College] {
        &self.data.colleges
    }

    pub fn skill_topics(&self) -> &[SkillTopic] {
        &self.data.skill_topics
    }

    pub fn skill_items(&self) -> &[SkillItem] {
        &self.data.skill_items
    }

    pub fn skills(&self) -> &[Skill] {
        &self.data.skills
    }

    pub fn technologies(&self) -> &[Technology] {
        &self.data.technologies
    }

    pub fn projects(&self) -> &[Project] {
        &self.data.projects
    }

    pub fn certifications(&self) -> &[Certification] {
        &self.data.certifications
    }

    pub fn employer(&self, id: Option<&str>) -> Option<&Employer> {
        lookup(&self.employers, &self.data.employers, id)
    }

    pub fn position(&self, id: Option<&str>) -> Option<&Position> {
        lookup(&self.positions, &self.data.positions, id)
    }

    pub fn skill_topic(&self, id: Option<&str>) -> Option<&SkillTopic> {
        lookup(&self.topics, &self.data.skill_topics, id)
    }

    pub fn project(&self, id: Option<&str>) -> Option<&Project> {
        lookup(&self.projects, &self.data.projects, id)
    }

    pub fn image(&self, id: Option<&str>) -> Option<&Image> {
        lookup(&self.images, &self.data.images, id)
    }

    pub fn technology(&self, id: Option<&str>) -> Option<&Technology> {
        lookup(&self.technologies, &self.data.technologies, id)
    }

    pub fn skill(&self, id: Option<&str>) -> Option<&Skill> {
        lookup(&self.skills, &self.data.skills, id)
    }

    /// Work experience entries of a position, ascending by `order`.
    pub fn experiences_for(&self, position_id: &str) -> impl Iterator<Item = &WorkExperience> {
        children(&self.experiences_by_position, &self.data.work_experiences, position_id)
    }

    /// Skill items of a topic, ascending by `order`.
    pub fn items_for(&self, topic_id: &str) -> impl Iterator<Item = &SkillItem> {
        children(&self.items_by_topic, &self.data.skill_items, topic_id)
    }

    /// Images attached to a project, ascending by `order`.
    pub fn images_for(&self, project_id: &str) -> impl Iterator<Item = &Image> {
        children(&self.images_by_project, &self.data.images, project_id)
    }
}

fn index_by_id<T>(
    tenant: &str,
    kind: &str,
    items: &[T],
    id: impl Fn(&T) -> &String,
) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(items.len());
    for (pos, item) in items.iter().enumerate() {
        let key = id(item);
        if index.contains_key(key) {
            // First occurrence wins so lookups stay deterministic.
            warn!("Tenant '{tenant}': duplicate {kind} id '{key}' ignored");
            continue;
        }
        index.insert(key.clone(), pos);
    }
    index
}

fn group_by_parent<T>(
    items: &[T],
    parent: impl Fn(&T) -> Option<&str>,
    order: impl Fn(&T) -> i64,
) -> HashMap<String, Vec<usize>> {
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (pos, item) in items.iter().enumerate() {
        if let Some(parent_id) = parent(item) {
            groups.entry(parent_id.to_string()).or_default().push(pos);
        }
    }
    for members in groups.values_mut() {
        // sort_by_key is stable: equal orders keep insertion order.
        members.sort_by_key(|&pos| order(&items[pos]));
    }
    groups
}

fn lookup<'a, T>(index: &HashMap<String, usize>, items: &'a [T], id: Option<&str>) -> Option<&'a T> {
    id.and_then(|id| index.get(id)).and_then(|&pos| items.get(pos))
}

fn children<'a, T>(
    groups: &'a HashMap<String, Vec<usize>>,
    items: &'a [T],
    parent_id: &str,
) -> impl Iterator<Item = &'a T> {
    groups
        .get(parent_id)
        .into_iter()
        .flatten()
        .filter_map(move |&pos| items.get(pos))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> TenantDataset {
        serde_json::from_value(serde_json::json!({
            "companyName": "Acme",
            "employers": [
                {"id": "e1", "name": "Initech", "city": "Austin", "state": "TX"},
                {"id": "e1", "name": "Duplicate", "city": "", "state": ""}
            ],
            "projects": [{"id": "p1", "name": "Gallery"}],
            "images": [
                {"id": "i2", "projectId": "p1", "order": 5},
                {"id": "i1", "projectId": "p1", "order": 1},
                {"id": "i3", "projectId": "p1", "order": 1},
                {"id": "orphan", "projectId": "missing", "order": 0}
            ],
            "resumeTemplate": "   "
        }))
        .unwrap()
    }

    #[test]
    fn test_lookup_resolves_first_occurrence() {
        let bundle = TenantBundle::new("acme", dataset());
        assert_eq!(bundle.employer(Some("e1")).unwrap().name, "Initech");
    }

    #[test]
    fn test_dangling_and_absent_references_are_none() {
        let bundle = TenantBundle::new("acme", dataset());
        assert!(bundle.employer(Some("nope")).is_none());
        assert!(bundle.employer(None).is_none());
        assert!(bundle.project(Some("missing")).is_none());
    }

    #[test]
    fn test_dangling_references_are_reported() {
        let bundle = TenantBundle::new("acme", dataset());
        assert_eq!(
            bundle.dangling_references(),
            vec!["image 'orphan' references missing project 'missing'"]
        );
    }

    #[test]
    fn test_children_are_sorted_stably_by_order() {
        let bundle = TenantBundle::new("acme", dataset());
        let ids: Vec<_> = bundle.images_for("p1").map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["i1", "i3", "i2"]);
        assert_eq!(bundle.images_for("unknown").count(), 0);
    }

    #[test]
    fn test_blank_template_counts_as_absent() {
        let bundle = TenantBundle::new("acme", dataset());
        assert!(bundle.template().is_none());
    }

    #[test]
    fn test_company_name_falls_back_to_key() {
        let bundle = TenantBundle::new("globex", TenantDataset::default());
        assert_eq!(bundle.company_name(), "globex");
        let bundle = TenantBundle::new("acme", dataset());
        assert_eq!(bundle.company_name(), "Acme");
    }
}
