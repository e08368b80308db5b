//! Page view models. Each page gets exactly the joined, display-ready data it
//! renders; dates are already formatted.

use serde::Serialize;

use crate::models::dates::EntityDate;
use crate::models::portfolio::{Certification, College, Profile};
use crate::tenant::bundle::TenantBundle;
use crate::tenant::links::PageLinks;
use crate::tenant::resolver::{
    resolve_flat_skills, resolve_highlight_skills, resolve_project_gallery, resolve_skill_groups,
    resolve_work_history, EmployerSummary, ProjectCard,
};

const FEATURED_PROJECTS: usize = 3;

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub company_name: String,
    pub profile: Option<Profile>,
    pub highlight_skills: Vec<String>,
    pub featured_projects: Vec<ProjectView>,
    pub links: PageLinks,
}

#[derive(Debug, Serialize)]
pub struct ResumePage {
    pub company_name: String,
    /// False when the dataset has no profile; the page shows "Resume Not Available".
    pub available: bool,
    pub profile: Option<Profile>,
    pub work_history: Vec<ResumePosition>,
    pub education: Vec<College>,
    pub skill_groups: Vec<SkillGroupView>,
    pub skills: String,
    pub certifications: Vec<CertificationView>,
    pub has_template: bool,
    pub links: PageLinks,
}

#[derive(Debug, Serialize)]
pub struct ResumePosition {
    pub title: String,
    pub employer: EmployerSummary,
    pub date_range: String,
    pub bullets: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SkillGroupView {
    pub name: String,
    pub items: String,
}

#[derive(Debug, Serialize)]
pub struct CertificationView {
    pub name: String,
    pub vendor: Option<String>,
    pub description: String,
    pub link: Option<String>,
    pub earned: Option<String>,
    pub expires: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PortfolioPage {
    pub company_name: String,
    pub projects: Vec<ProjectView>,
    pub links: PageLinks,
}

#[derive(Debug, Serialize)]
pub struct ProjectView {
    pub id: String,
    pub name: String,
    pub date: String,
    pub short_description: String,
    pub description: String,
    pub thumbnail_src: String,
    pub images: Vec<ImageView>,
    pub technologies: Vec<String>,
    pub skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ImageView {
    pub id: String,
    pub src: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ContactPage {
    pub company_name: String,
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub phone_number: Option<String>,
    pub github_url: Option<String>,
    pub linkedin_url: Option<String>,
    pub twitter_url: Option<String>,
    pub links: PageLinks,
}

/// "Jan 2020 - Present", "Jan 2020 - Mar 2022", "No date - Present".
pub fn date_range(start: &EntityDate, end: &EntityDate) -> String {
    format!("{} - {}", start.display(), end.display_or("Present"))
}

impl HomePage {
    pub fn build(bundle: &TenantBundle) -> Self {
        Self {
            company_name: bundle.company_name().to_string(),
            profile: bundle.profile().cloned(),
            highlight_skills: resolve_highlight_skills(bundle),
            featured_projects: resolve_project_gallery(bundle)
                .into_iter()
                .take(FEATURED_PROJECTS)
                .map(ProjectView::from)
                .collect(),
            links: PageLinks::for_tenant(bundle.key()),
        }
    }
}

impl ResumePage {
    pub fn build(bundle: &TenantBundle) -> Self {
        let work_history = resolve_work_history(bundle)
            .into_iter()
            .map(|entry| ResumePosition {
                date_range: date_range(
                    &entry.position.date_started,
                    &entry.position.date_finished,
                ),
                title: entry.position.name,
                employer: entry.employer,
                bullets: entry.experiences.into_iter().map(|w| w.description).collect(),
            })
            .collect();

        Self {
            company_name: bundle.company_name().to_string(),
            available: bundle.profile().is_some(),
            profile: bundle.profile().cloned(),
            work_history,
            education: bundle.colleges().to_vec(),
            skill_groups: resolve_skill_groups(bundle)
                .into_iter()
                .map(|g| SkillGroupView {
                    name: g.topic.name,
                    items: g.items,
                })
                .collect(),
            skills: resolve_flat_skills(bundle),
            certifications: bundle
                .certifications()
                .iter()
                .map(CertificationView::from)
                .collect(),
            has_template: bundle.template().is_some(),
            links: PageLinks::for_tenant(bundle.key()),
        }
    }
}

impl From<&Certification> for CertificationView {
    fn from(cert: &Certification) -> Self {
        // Absent dates are left out rather than printed as placeholders.
        let shown = |d: &EntityDate| (!d.is_missing()).then(|| d.display());
        Self {
            name: cert.name.clone(),
            vendor: cert.vendor.clone().filter(|v| !v.is_empty()),
            description: cert.description.clone(),
            link: cert.link_to_site.clone().filter(|l| !l.is_empty()),
            earned: shown(&cert.date_earned),
            expires: shown(&cert.date_expires),
        }
    }
}

impl PortfolioPage {
    pub fn build(bundle: &TenantBundle) -> Self {
        Self {
            company_name: bundle.company_name().to_string(),
            projects: resolve_project_gallery(bundle)
                .into_iter()
                .map(ProjectView::from)
                .collect(),
            links: PageLinks::for_tenant(bundle.key()),
        }
    }
}

impl From<ProjectCard> for ProjectView {
    fn from(card: ProjectCard) -> Self {
        Self {
            thumbnail_src: card.thumbnail.src().to_string(),
            id: card.project.id,
            name: card.project.name,
            date: card.project.date.display(),
            short_description: card.project.short_description,
            description: card.project.description,
            images: card
                .images
                .into_iter()
                .map(|image| ImageView {
                    src: image.source().map(str::to_string),
                    id: image.id,
                    description: image.description,
                })
                .collect(),
            technologies: card.technologies.into_iter().map(|t| t.name).collect(),
            skills: card.skills.into_iter().map(|s| s.description).collect(),
        }
    }
}

impl ContactPage {
    pub fn build(bundle: &TenantBundle) -> Self {
        let profile = bundle.profile();
        let field = |f: fn(&Profile) -> &Option<String>| {
            profile.and_then(|p| f(p).clone()).filter(|s| !s.is_empty())
        };
        Self {
            company_name: bundle.company_name().to_string(),
            name: profile.map(|p| p.name.clone()),
            contact_email: field(|p| &p.contact_email),
            phone_number: field(|p| &p.phone_number),
            github_url: field(|p| &p.github_url),
            linkedin_url: field(|p| &p.linkedin_url),
            twitter_url: field(|p| &p.twitter_url),
            links: PageLinks::for_tenant(bundle.key()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    use crate::models::portfolio::TenantDataset;

    fn bundle(key: &str, value: serde_json::Value) -> TenantBundle {
        let dataset: TenantDataset = serde_json::from_value(value).unwrap();
        TenantBundle::new(key, dataset)
    }

    #[test]
    fn test_date_range_labels() {
        let start = EntityDate::parse(Some("2020-01-01"));
        assert_eq!(date_range(&start, &EntityDate::Missing), "Jan 2020 - Present");
        let end = EntityDate::parse(Some("2022-03-01"));
        assert_eq!(date_range(&start, &end), "Jan 2020 - Mar 2022");
        assert_eq!(
            date_range(&EntityDate::Missing, &EntityDate::Invalid("?".into())),
            "No date - Invalid Date"
        );
    }

    #[test]
    fn test_resume_page_without_profile_is_unavailable() {
        let page = ResumePage::build(&bundle("acme", json!({})));
        assert!(!page.available);
        assert!(!page.has_template);
        assert!(page.work_history.is_empty());
    }

    #[test]
    fn test_resume_page_formats_positions_and_certifications() {
        let page = ResumePage::build(&bundle(
            "acme",
            json!({
                "userProfile": {"name": "Ada Lovelace"},
                "employers": [{"id": "e1", "name": "Initech", "city": "Austin", "state": "TX"}],
                "positions": [{"id": "p1", "name": "Engineer", "employerId": "e1", "dateStarted": "2021-02-01"}],
                "workExperiences": [{"id": "w1", "positionId": "p1", "description": "Built things"}],
                "certifications": [
                    {"id": "c1", "name": "CKA", "vendor": "", "dateEarned": "2023-05-01"}
                ],
                "resumeTemplate": "<html></html>"
            }),
        ));
        assert!(page.available);
        assert!(page.has_template);
        assert_eq!(page.work_history[0].date_range, "Feb 2021 - Present");
        assert_eq!(page.work_history[0].bullets, vec!["Built things"]);
        assert_eq!(page.certifications[0].earned.as_deref(), Some("May 2023"));
        assert!(page.certifications[0].expires.is_none());
        assert!(page.certifications[0].vendor.is_none());
    }

    #[test]
    fn test_home_page_features_first_three_projects() {
        let page = HomePage::build(&bundle(
            "acme",
            json!({
                "projects": [
                    {"id": "p4", "defaultOrder": 4},
                    {"id": "p1", "defaultOrder": 1},
                    {"id": "p3", "defaultOrder": 3},
                    {"id": "p2", "defaultOrder": 2}
                ]
            }),
        ));
        let ids: Vec<_> = page.featured_projects.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
        assert_eq!(page.featured_projects[0].date, "No date");
        assert_eq!(page.links.resume, "/acme/resume");
    }

    #[test]
    fn test_contact_page_drops_empty_channels() {
        let page = ContactPage::build(&bundle(
            "default",
            json!({"userProfile": {"name": "Ada", "contactEmail": "ada@example.com", "githubUrl": ""}}),
        ));
        assert_eq!(page.contact_email.as_deref(), Some("ada@example.com"));
        assert!(page.github_url.is_none());
        assert_eq!(page.links.contact, "/contact");
    }
}
