//! Postgres-backed tenant source.
//!
//! Same logical entities as the JSON files, one table per collection with
//! snake_case columns and `order_index` for sort order. A tenant key is a job
//! application's `custom_url`; the reserved default tenant is "no
//! application".
//!
//! Most collections are shared by every tenant. An application narrows three
//! of them through join tables (`job_application_resume_work_experience`,
//! `job_application_resume_college`, `job_application_portfolio_project`);
//! picking nothing means the full collection. Skill topics and items carry
//! their own nullable `job_application_id`: NULL rows are shared, the rest
//! belong to one application. The resume template is the application's
//! `resume_template_id` row of `resume_templates`, whose body lives in
//! `ejs_code`; the default tenant uses the `is_default` template.
//! Dates are stored as ISO-8601 text and normalized exactly like the JSON path.

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use crate::models::dates::EntityDate;
use crate::models::portfolio::{
    Certification, College, Employer, Image, Position, Profile, Project, Skill, SkillItem,
    SkillTopic, Technology, TenantDataset, WorkExperience,
};
use crate::tenant::source::{SourceError, TenantSource, DEFAULT_TENANT};

#[derive(Clone)]
pub struct PgTenantSource {
    pool: PgPool,
}

impl PgTenantSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// `Ok(None)` for an unknown key, `Ok(Some(None))` for the default partition.
    async fn partition_for(&self, key: &str) -> Result<Option<Partition>, SourceError> {
        if key == DEFAULT_TENANT {
            return Ok(Some(Partition {
                id: None,
                company_name: None,
            }));
        }
        let row: Option<(String, Option<String>)> = sqlx::query_as(
            "SELECT id, company_name FROM job_applications WHERE custom_url = $1 LIMIT 1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(id, company_name)| Partition {
            id: Some(id),
            company_name,
        }))
    }
}

struct Partition {
    id: Option<String>,
    company_name: Option<String>,
}

#[async_trait]
impl TenantSource for PgTenantSource {
    async fn tenant_keys(&self) -> Result<Vec<String>, SourceError> {
        let mut keys: Vec<String> = sqlx::query_scalar(
            "SELECT custom_url FROM job_applications \
             WHERE custom_url IS NOT NULL AND custom_url <> '' ORDER BY custom_url",
        )
        .fetch_all(&self.pool)
        .await?;
        if !keys.iter().any(|k| k == DEFAULT_TENANT) {
            keys.push(DEFAULT_TENANT.to_string());
        }
        keys.sort();
        Ok(keys)
    }

    async fn fetch(&self, key: &str) -> Result<Option<TenantDataset>, SourceError> {
        let Some(partition) = self.partition_for(key).await? else {
            debug!("No job application with custom_url '{key}'");
            return Ok(None);
        };
        let pid = partition.id.as_deref();
        let pool = &self.pool;

        let user_profile = sqlx::query_as::<_, ProfileRow>("SELECT * FROM user_profiles LIMIT 1")
            .fetch_optional(pool)
            .await?
            .map(Profile::from);

        let sql = format!(
            "SELECT c.* FROM colleges c WHERE {} ORDER BY c.year_graduated DESC",
            picked_by_application("c", "job_application_resume_college", "college_id")
        );
        let colleges = sqlx::query_as::<_, CollegeRow>(&sql)
            .bind(pid)
            .fetch_all(pool)
            .await?;

        let employers = sqlx::query_as::<_, EmployerRow>("SELECT * FROM employers ORDER BY name")
            .fetch_all(pool)
            .await?;

        let positions = sqlx::query_as::<_, PositionRow>("SELECT * FROM positions")
            .fetch_all(pool)
            .await?;

        let sql = format!(
            "SELECT we.* FROM work_experiences we WHERE {} ORDER BY we.order_index",
            picked_by_application(
                "we",
                "job_application_resume_work_experience",
                "work_experience_id"
            )
        );
        let work_experiences = sqlx::query_as::<_, WorkExperienceRow>(&sql)
            .bind(pid)
            .fetch_all(pool)
            .await?;

        let skill_topics = sqlx::query_as::<_, OrderedRow>(
            "SELECT id, name, order_index FROM skill_topics \
             WHERE job_application_id IS NULL OR job_application_id = $1::text \
             ORDER BY order_index",
        )
        .bind(pid)
        .fetch_all(pool)
        .await?;

        let skill_items = sqlx::query_as::<_, SkillItemRow>(
            "SELECT * FROM skill_items \
             WHERE job_application_id IS NULL OR job_application_id = $1::text \
             ORDER BY skill_topic_id, order_index",
        )
        .bind(pid)
        .fetch_all(pool)
        .await?;

        let technologies = sqlx::query_as::<_, OrderedRow>(
            "SELECT id, name, order_index FROM technologies ORDER BY order_index",
        )
        .fetch_all(pool)
        .await?;

        let sql = format!(
            "SELECT p.*, COALESCE( \
                 (SELECT array_agg(pt.technology_id ORDER BY pt.technology_id) \
                  FROM project_technologies pt WHERE pt.project_id = p.id), \
                 ARRAY[]::text[]) AS technology_ids \
             FROM projects p WHERE {} ORDER BY p.default_order",
            picked_by_application("p", "job_application_portfolio_project", "project_id")
        );
        let projects = sqlx::query_as::<_, ProjectRow>(&sql)
            .bind(pid)
            .fetch_all(pool)
            .await?;

        let images = sqlx::query_as::<_, ImageRow>("SELECT * FROM images ORDER BY order_index")
            .fetch_all(pool)
            .await?;

        let certifications = sqlx::query_as::<_, CertificationRow>(
            "SELECT * FROM certifications ORDER BY date_earned DESC",
        )
        .fetch_all(pool)
        .await?;

        let resume_template: Option<String> = match pid {
            Some(id) => {
                sqlx::query_scalar(
                    "SELECT rt.ejs_code FROM resume_templates rt \
                     JOIN job_applications ja ON ja.resume_template_id = rt.id \
                     WHERE ja.id = $1",
                )
                .bind(id)
                .fetch_optional(pool)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    "SELECT ejs_code FROM resume_templates WHERE is_default ORDER BY id LIMIT 1",
                )
                .fetch_optional(pool)
                .await?
            }
        };

        Ok(Some(TenantDataset {
            company_name: partition.company_name,
            user_profile,
            colleges: colleges.into_iter().map(College::from).collect(),
            employers: employers.into_iter().map(Employer::from).collect(),
            positions: positions.into_iter().map(Position::from).collect(),
            work_experiences: work_experiences
                .into_iter()
                .map(WorkExperience::from)
                .collect(),
            skill_topics: skill_topics
                .into_iter()
                .map(|r| SkillTopic {
                    id: r.id,
                    name: r.name,
                    order: r.order_index.into(),
                })
                .collect(),
            skill_items: skill_items.into_iter().map(SkillItem::from).collect(),
            // The relational schema only has grouped skills.
            skills: Vec::<Skill>::new(),
            technologies: technologies
                .into_iter()
                .map(|r| Technology {
                    id: r.id,
                    name: r.name,
                    order: r.order_index.into(),
                })
                .collect(),
            projects: projects.into_iter().map(Project::from).collect(),
            images: images.into_iter().map(Image::from).collect(),
            certifications: certifications
                .into_iter()
                .map(Certification::from)
                .collect(),
            resume_template,
        }))
    }
}

/// `WHERE` clause keeping the rows of `alias` that the application bound to
/// `$1` picked in `join_table`. The default tenant (`$1` NULL) and an
/// application that picked nothing see every row.
fn picked_by_application(alias: &str, join_table: &str, join_column: &str) -> String {
    format!(
        "($1::text IS NULL \
         OR NOT EXISTS (SELECT 1 FROM {join_table} j WHERE j.job_application_id = $1::text) \
         OR {alias}.id IN (SELECT j.{join_column} FROM {join_table} j \
                           WHERE j.job_application_id = $1::text))"
    )
}

// ── Row types ───────────────────────────────────────────────────────────────

#[derive(Debug, FromRow)]
struct ProfileRow {
    id: String,
    name: String,
    email: Option<String>,
    summary: Option<String>,
    contact_email: Option<String>,
    phone_number: Option<String>,
    profile_image_url: Option<String>,
    github_url: Option<String>,
    linkedin_url: Option<String>,
    youtube_url: Option<String>,
    facebook_url: Option<String>,
    twitter_url: Option<String>,
}

impl From<ProfileRow> for Profile {
    fn from(r: ProfileRow) -> Self {
        Profile {
            id: Some(r.id),
            name: r.name,
            email: r.email,
            summary: r.summary,
            contact_email: r.contact_email,
            phone_number: r.phone_number,
            profile_image_url: r.profile_image_url,
            github_url: r.github_url,
            linkedin_url: r.linkedin_url,
            youtube_url: r.youtube_url,
            facebook_url: r.facebook_url,
            twitter_url: r.twitter_url,
        }
    }
}

#[derive(Debug, FromRow)]
struct CollegeRow {
    id: String,
    name: String,
    degree: String,
    years_attended: Option<String>,
    year_graduated: Option<i32>,
    month_graduated: Option<String>,
    city: Option<String>,
    state: Option<String>,
    gpa: Option<f64>,
    is_online: Option<bool>,
}

impl From<CollegeRow> for College {
    fn from(r: CollegeRow) -> Self {
        College {
            id: r.id,
            name: r.name,
            degree: r.degree,
            years_attended: r.years_attended,
            year_graduated: r.year_graduated,
            month_graduated: r.month_graduated,
            city: r.city,
            state: r.state,
            gpa: r.gpa,
            is_online: r.is_online.unwrap_or(false),
        }
    }
}

#[derive(Debug, FromRow)]
struct EmployerRow {
    id: String,
    name: String,
    city: Option<String>,
    state: Option<String>,
}

impl From<EmployerRow> for Employer {
    fn from(r: EmployerRow) -> Self {
        Employer {
            id: r.id,
            name: r.name,
            city: r.city.unwrap_or_default(),
            state: r.state.unwrap_or_default(),
        }
    }
}

#[derive(Debug, FromRow)]
struct PositionRow {
    id: String,
    name: String,
    employer_id: Option<String>,
    date_started: Option<String>,
    date_finished: Option<String>,
}

impl From<PositionRow> for Position {
    fn from(r: PositionRow) -> Self {
        Position {
            id: r.id,
            name: r.name,
            employer_id: r.employer_id,
            date_started: EntityDate::parse(r.date_started.as_deref()),
            date_finished: EntityDate::parse(r.date_finished.as_deref()),
        }
    }
}

#[derive(Debug, FromRow)]
struct WorkExperienceRow {
    id: String,
    position_id: Option<String>,
    description: String,
    is_visible: Option<bool>,
    order_index: i32,
}

impl From<WorkExperienceRow> for WorkExperience {
    fn from(r: WorkExperienceRow) -> Self {
        WorkExperience {
            id: r.id,
            position_id: r.position_id,
            description: r.description,
            is_visible: r.is_visible.unwrap_or(true),
            order: r.order_index.into(),
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderedRow {
    id: String,
    name: String,
    order_index: i32,
}

#[derive(Debug, FromRow)]
struct SkillItemRow {
    id: String,
    description: String,
    skill_topic_id: Option<String>,
    order_index: i32,
}

impl From<SkillItemRow> for SkillItem {
    fn from(r: SkillItemRow) -> Self {
        SkillItem {
            id: r.id,
            description: r.description,
            skill_topic_id: r.skill_topic_id,
            order: r.order_index.into(),
        }
    }
}

#[derive(Debug, FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    date: Option<String>,
    short_description: Option<String>,
    description: Option<String>,
    image_thumbnail_id: Option<String>,
    default_order: i32,
    technology_ids: Vec<String>,
}

impl From<ProjectRow> for Project {
    fn from(r: ProjectRow) -> Self {
        Project {
            id: r.id,
            name: r.name,
            date: EntityDate::parse(r.date.as_deref()),
            short_description: r.short_description.unwrap_or_default(),
            description: r.description.unwrap_or_default(),
            image_thumbnail_id: r.image_thumbnail_id,
            default_order: r.default_order.into(),
            technology_ids: r.technology_ids,
            skill_ids: Vec::new(),
        }
    }
}

#[derive(Debug, FromRow)]
struct ImageRow {
    id: String,
    description: Option<String>,
    size: Option<i64>,
    base64_content: Option<String>,
    image_url: Option<String>,
    project_id: Option<String>,
    order_index: i32,
}

impl From<ImageRow> for Image {
    fn from(r: ImageRow) -> Self {
        Image {
            id: r.id,
            description: r.description,
            size: r.size.unwrap_or(0).max(0) as u64,
            base64_content: r.base64_content,
            image_url: r.image_url,
            project_id: r.project_id,
            order: r.order_index.into(),
        }
    }
}

#[derive(Debug, FromRow)]
struct CertificationRow {
    id: String,
    name: String,
    vendor: Option<String>,
    description: Option<String>,
    link_to_site: Option<String>,
    date_earned: Option<String>,
    date_expires: Option<String>,
}

impl From<CertificationRow> for Certification {
    fn from(r: CertificationRow) -> Self {
        Certification {
            id: r.id,
            name: r.name,
            vendor: r.vendor,
            description: r.description.unwrap_or_default(),
            link_to_site: r.link_to_site,
            date_earned: EntityDate::parse(r.date_earned.as_deref()),
            date_expires: EntityDate::parse(r.date_expires.as_deref()),
        }
    }
}
