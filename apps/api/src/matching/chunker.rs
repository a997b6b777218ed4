//! Evidence Chunker: one short text fragment per discrete profile fact.
//!
//! Order follows the profile: headline, summary, location, skills, each
//! experience, each degree. Vectors are attached later by the engine.

use crate::matching::MatchError;
use crate::models::profile::{present, CandidateProfile, Education, Experience};

/// Splits a profile into evidence fragments.
/// Fails with `NoEvidence` when nothing analyzable is present.
pub fn chunk_profile(profile: &CandidateProfile) -> Result<Vec<String>, MatchError> {
    let mut chunks = Vec::new();

    if let Some(headline) = present(&profile.headline) {
        chunks.push(format!("Headline: {headline}"));
    }
    if let Some(summary) = present(&profile.summary) {
        chunks.push(format!("Summary: {summary}"));
    }
    if let Some(location) = present(&profile.location) {
        chunks.push(format!("Location: {location}"));
    }

    let skills: Vec<&str> = profile
        .skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !skills.is_empty() {
        chunks.push(format!("Skills: {}", skills.join(", ")));
    }

    chunks.extend(profile.experiences.iter().filter_map(experience_chunk));
    chunks.extend(profile.education.iter().filter_map(education_chunk));

    if chunks.is_empty() {
        return Err(MatchError::NoEvidence);
    }
    Ok(chunks)
}

/// "{title} at {company} ({start} - {end}): {description}", absent parts omitted.
fn experience_chunk(exp: &Experience) -> Option<String> {
    let title = present(&exp.title);
    let company = present(&exp.company);
    let description = present(&exp.description);

    let mut text = match (title, company) {
        (Some(t), Some(c)) => format!("{t} at {c}"),
        (Some(t), None) => t.to_string(),
        (None, Some(c)) => format!("Worked at {c}"),
        (None, None) => String::new(),
    };

    if !text.is_empty() {
        if let Some(place) = present(&exp.location) {
            text.push_str(&format!(", {place}"));
        }
        if let Some(start) = present(&exp.start_date) {
            let end = present(&exp.end_date).unwrap_or("Present");
            text.push_str(&format!(" ({start} - {end})"));
        }
    }

    match (text.is_empty(), description) {
        (true, None) => None,
        (true, Some(d)) => Some(d.to_string()),
        (false, None) => Some(text),
        (false, Some(d)) => Some(format!("{text}: {d}")),
    }
}

/// "{degree} in {field} at {school} ({start} - {end})", absent parts omitted.
fn education_chunk(edu: &Education) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    match (present(&edu.degree), present(&edu.field_of_study)) {
        (Some(d), Some(f)) => parts.push(format!("{d} in {f}")),
        (Some(d), None) => parts.push(d.to_string()),
        (None, Some(f)) => parts.push(format!("Studied {f}")),
        (None, None) => {}
    }

    if let Some(school) = present(&edu.school) {
        if parts.is_empty() {
            parts.push(format!("Studied at {school}"));
        } else {
            parts.push(format!("at {school}"));
        }
    }

    if parts.is_empty() {
        return None;
    }

    let mut text = parts.join(" ");
    match (present(&edu.start_year), present(&edu.end_year)) {
        (Some(s), Some(e)) => text.push_str(&format!(" ({s} - {e})")),
        (Some(s), None) => text.push_str(&format!(" (from {s})")),
        (None, Some(e)) => text.push_str(&format!(" ({e})")),
        (None, None) => {}
    }
    Some(text)
}
