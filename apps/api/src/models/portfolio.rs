use serde::{Deserialize, Serialize};

use crate::models::dates::EntityDate;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    pub id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub summary: Option<String>,
    pub contact_email: Option<String>,
    pub phone_number: Option<String>,
    pub profile_image_url: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub youtube_url: Option<String>,
    pub facebook_url: Option<String>,
    pub twitter_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Employer {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub employer_id: Option<String>,
    #[serde(default)]
    pub date_started: EntityDate,
    /// Missing means the position is current.
    #[serde(default)]
    pub date_finished: EntityDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub id: String,
    #[serde(default)]
    pub position_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
    #[serde(default)]
    pub order: i64,
}

fn default_visible() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct College {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub years_attended: Option<String>,
    #[serde(default)]
    pub year_graduated: Option<i32>,
    #[serde(default)]
    pub month_graduated: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub gpa: Option<f64>,
    #[serde(default)]
    pub is_online: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkillTopic {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkillItem {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skill_topic_id: Option<String>,
    #[serde(default)]
    pub order: i64,
}

/// Ungrouped skill, used by the marketing pages and by `Project::skill_ids`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: String,
    #[serde(default, alias = "name")]
    pub description: String,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Technology {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub date: EntityDate,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_thumbnail_id: Option<String>,
    #[serde(default)]
    pub default_order: i64,
    #[serde(default)]
    pub technology_ids: Vec<String>,
    #[serde(default)]
    pub skill_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub size: u64,
    /// Inline `data:` URI content.
    #[serde(default)]
    pub base64_content: Option<String>,
    /// Remote alternative to inline content.
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub order: i64,
}

impl Image {
    /// Remote URL wins over inline content.
    pub fn source(&self) -> Option<&str> {
        self.image_url
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.base64_content.as_deref().filter(|s| !s.is_empty()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link_to_site: Option<String>,
    #[serde(default)]
    pub date_earned: EntityDate,
    #[serde(default)]
    pub date_expires: EntityDate,
}

/// One company's dataset exactly as stored: `data/companies/<key>.json` or the
/// equivalent relational rows. Every collection is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TenantDataset {
    pub company_name: Option<String>,
    pub user_profile: Option<Profile>,
    pub colleges: Vec<College>,
    pub employers: Vec<Employer>,
    pub positions: Vec<Position>,
    pub work_experiences: Vec<WorkExperience>,
    pub skill_topics: Vec<SkillTopic>,
    pub skill_items: Vec<SkillItem>,
    pub skills: Vec<Skill>,
    pub technologies: Vec<Technology>,
    pub projects: Vec<Project>,
    pub images: Vec<Image>,
    pub certifications: Vec<Certification>,
    /// Handlebars source for the downloadable resume.
    pub resume_template: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_tolerates_missing_collections() {
        let ds: TenantDataset =
            serde_json::from_str(r#"{"companyName": "Acme", "userProfile": {"name": "Ada"}}"#)
                .unwrap();
        assert_eq!(ds.company_name.as_deref(), Some("Acme"));
        assert_eq!(ds.user_profile.unwrap().name, "Ada");
        assert!(ds.positions.is_empty());
        assert!(ds.resume_template.is_none());
    }

    #[test]
    fn test_dataset_rejects_wrong_collection_shape() {
        let result: Result<TenantDataset, _> = serde_json::from_str(r#"{"positions": "nope"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_dates_are_normalized_on_load() {
        let ds: TenantDataset = serde_json::from_str(
            r#"{"positions": [
                {"id": "p1", "name": "Dev", "employerId": "e1", "dateStarted": "2020-01-15", "dateFinished": null},
                {"id": "p2", "name": "Lead", "dateStarted": "whenever"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(ds.positions[0].date_started.display(), "Jan 2020");
        assert!(ds.positions[0].date_finished.is_missing());
        assert_eq!(ds.positions[1].date_started.display(), "Invalid Date");
        assert!(ds.positions[1].employer_id.is_none());
    }

    #[test]
    fn test_work_experience_defaults_to_visible() {
        let we: WorkExperience =
            serde_json::from_str(r#"{"id": "w1", "positionId": "p1", "description": "Shipped"}"#)
                .unwrap();
        assert!(we.is_visible);
        assert_eq!(we.order, 0);
    }

    #[test]
    fn test_skill_accepts_name_alias() {
        let skill: Skill = serde_json::from_str(r#"{"id": "s1", "name": "Rust"}"#).unwrap();
        assert_eq!(skill.description, "Rust");
    }

    #[test]
    fn test_image_source_prefers_url() {
        let mut image = Image {
            id: "i1".into(),
            description: None,
            size: 10,
            base64_content: Some("data:image/png;base64,AAAA".into()),
            image_url: Some("https://cdn.example.com/a.png".into()),
            project_id: None,
            order: 0,
        };
        assert_eq!(image.source(), Some("https://cdn.example.com/a.png"));
        image.image_url = None;
        assert_eq!(image.source(), Some("data:image/png;base64,AAAA"));
    }
}
