//! Resume mutations.
//!
//! Every edit a client makes to a resume is expressed as a `ResumeAction` and
//! applied with `apply_action`. Updates are partial: fields missing from the
//! payload keep their current value. Updates and removals that reference an
//! unknown item id leave the resume untouched and report `changed = false`.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::resume::{
    Certificate, Education, Experience, Language, Project, ResumeContent, ResumeDocument, Skill,
    TemplateStyle,
};

/// Partial update of the personal info block. `None` fields are left as-is.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PersonalInfoPatch {
    pub full_name: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub linkedin: Option<String>,
}

/// Items addressable by id inside a resume section.
trait Identified {
    fn id(&self) -> &str;
}

macro_rules! identified {
    ($($ty:ty),*) => {
        $(impl Identified for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

identified!(Experience, Education, Project, Skill, Certificate, Language);

/// Partial update of one section item, matched by `id`.
trait ItemPatch {
    type Target: Identified;

    fn id(&self) -> &str;
    fn apply(self, target: &mut Self::Target);
}

macro_rules! item_patch {
    ($(#[$meta:meta])* $name:ident => $target:ty { $($field:ident),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, Deserialize, Serialize)]
        #[serde(default)]
        pub struct $name {
            pub id: String,
            $(pub $field: Option<String>,)*
        }

        impl ItemPatch for $name {
            type Target = $target;

            fn id(&self) -> &str {
                &self.id
            }

            fn apply(self, target: &mut $target) {
                $(merge(&mut target.$field, self.$field);)*
            }
        }
    };
}

item_patch!(ExperiencePatch => Experience {
    title, company, location, start_date, end_date, description,
});
item_patch!(EducationPatch => Education {
    degree, school, location, graduation_date, description,
});
item_patch!(ProjectPatch => Project {
    title, technologies, link, start_date, end_date, description,
});
item_patch!(CertificatePatch => Certificate { name, issuer, date });

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ResumeAction {
    UpdatePersonalInfo(PersonalInfoPatch),
    UpdateSummary(String),
    SetTemplate(TemplateStyle),
    AddExperience(Experience),
    UpdateExperience(ExperiencePatch),
    RemoveExperience { id: String },
    AddEducation(Education),
    UpdateEducation(EducationPatch),
    RemoveEducation { id: String },
    AddProject(Project),
    UpdateProject(ProjectPatch),
    RemoveProject { id: String },
    AddSkill(Skill),
    RemoveSkill { id: String },
    AddCertificate(Certificate),
    UpdateCertificate(CertificatePatch),
    RemoveCertificate { id: String },
    AddLanguage(Language),
    RemoveLanguage { id: String },
    /// Replaces all content; id and created_at survive.
    Import(ResumeContent),
    Reset,
}

fn patch_item<P: ItemPatch>(items: &mut [P::Target], patch: P) -> bool {
    match items.iter_mut().find(|existing| existing.id() == patch.id()) {
        Some(slot) => {
            patch.apply(slot);
            true
        }
        None => false,
    }
}

fn remove_item<T: Identified>(items: &mut Vec<T>, id: &str) -> bool {
    let before = items.len();
    items.retain(|item| item.id() != id);
    items.len() != before
}

fn merge(field: &mut String, value: Option<String>) {
    if let Some(v) = value {
        *field = v;
    }
}

/// Applies one action. Returns whether the resume changed; `updated_at` is
/// bumped only when it did.
pub fn apply_action(resume: &mut ResumeDocument, action: ResumeAction) -> bool {
    let content = &mut resume.content;
    let changed = match action {
        ResumeAction::UpdatePersonalInfo(patch) => {
            let info = &mut content.personal_info;
            merge(&mut info.full_name, patch.full_name);
            merge(&mut info.title, patch.title);
            merge(&mut info.email, patch.email);
            merge(&mut info.phone, patch.phone);
            merge(&mut info.location, patch.location);
            merge(&mut info.website, patch.website);
            merge(&mut info.linkedin, patch.linkedin);
            true
        }
        ResumeAction::UpdateSummary(summary) => {
            content.summary = summary;
            true
        }
        ResumeAction::SetTemplate(template) => {
            content.template = template;
            true
        }
        ResumeAction::AddExperience(item) => {
            content.experience.push(item);
            true
        }
        ResumeAction::UpdateExperience(patch) => patch_item(&mut content.experience, patch),
        ResumeAction::RemoveExperience { id } => remove_item(&mut content.experience, &id),
        ResumeAction::AddEducation(item) => {
            content.education.push(item);
            true
        }
        ResumeAction::UpdateEducation(patch) => patch_item(&mut content.education, patch),
        ResumeAction::RemoveEducation { id } => remove_item(&mut content.education, &id),
        ResumeAction::AddProject(item) => {
            content.projects.push(item);
            true
        }
        ResumeAction::UpdateProject(patch) => patch_item(&mut content.projects, patch),
        ResumeAction::RemoveProject { id } => remove_item(&mut content.projects, &id),
        ResumeAction::AddSkill(item) => {
            content.skills.push(item);
            true
        }
        ResumeAction::RemoveSkill { id } => remove_item(&mut content.skills, &id),
        ResumeAction::AddCertificate(item) => {
            content.certificates.push(item);
            true
        }
        ResumeAction::UpdateCertificate(patch) => patch_item(&mut content.certificates, patch),
        ResumeAction::RemoveCertificate { id } => remove_item(&mut content.certificates, &id),
        ResumeAction::AddLanguage(item) => {
            content.languages.push(item);
            true
        }
        ResumeAction::RemoveLanguage { id } => remove_item(&mut content.languages, &id),
        ResumeAction::Import(imported) => {
            *content = imported;
            true
        }
        ResumeAction::Reset => {
            *content = ResumeContent::default();
            resume.created_at = Utc::now();
            true
        }
    };

    if changed {
        resume.updated_at = Utc::now();
    }
    changed
}
