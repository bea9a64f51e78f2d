use chrono::{DateTime, Utc};
use itertools::Itertools;
use shared::{
    details::ReleaseDetails,
    fields::{Field, FieldGroup},
};
use tracing::{debug, info};

use crate::document::{Header, OutputDocument, Section, SectionKind, READ_MORE};
use crate::error::{Result, SleeveError};
use crate::resolver::ResolvedEntity;

pub const DEFAULT_FULL_THRESHOLD: usize = 25;

/// Commented-out link a later manual edit can fill in.
pub fn link_placeholder(field: Field, entity: &ResolvedEntity) -> String {
    format!("<!-- [{}](): {} -->", field.label(), entity.identity)
}

fn block_placeholder(heading: &str, entity: &ResolvedEntity) -> String {
    format!("<!-- {}: {} -->", heading, entity.identity)
}

fn link_section(kind: SectionKind, group: FieldGroup, entity: &ResolvedEntity) -> Section {
    let lines = Field::in_group(group)
        .map(|field| match entity.value(field) {
            Some(url) => format!("[{}]({})", field.label(), url),
            None => link_placeholder(field, entity),
        })
        .collect();
    Section::new(kind, None, lines)
}

fn text_section(kind: SectionKind, field: Field, entity: &ResolvedEntity) -> Section {
    let heading = field.label();
    match entity.value(field) {
        Some(text) => Section::new(
            kind,
            Some(heading),
            text.lines().map(str::to_string).collect(),
        ),
        None => Section::placeholder(kind, heading, block_placeholder(heading, entity)),
    }
}

#[derive(Debug, Clone)]
pub struct ContentAssembler {
    display_full_threshold: usize,
}

impl Default for ContentAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_FULL_THRESHOLD)
    }
}

impl ContentAssembler {
    pub fn new(display_full_threshold: usize) -> Self {
        Self {
            display_full_threshold,
        }
    }

    /// Builds the document skeleton: header, link blocks, info and the
    /// enrichment sections the cache could already fill.
    pub fn assemble(&self, entity: &ResolvedEntity, now: DateTime<Utc>) -> Result<OutputDocument> {
        let identity = &entity.identity;
        if identity.artist.is_empty() || identity.title.is_empty() {
            return Err(SleeveError::Assembly(format!(
                "cannot assemble an untitled release ({identity})"
            )));
        }

        let date = entity
            .catalog
            .as_ref()
            .and_then(|c| c.date_added)
            .unwrap_or(now);

        let header = Header {
            title: identity.title.clone(),
            artist: identity.artist.clone(),
            date: date.format("%Y-%m-%d").to_string(),
            year: entity.value(Field::Year).map(str::to_string),
            label: entity.value(Field::Label).map(str::to_string),
            tags: entity
                .value(Field::Genres)
                .map(|g| g.split(',').map(|t| t.trim().to_string()).collect())
                .unwrap_or_default(),
            cover: entity.value(Field::Cover).map(str::to_string),
            catalog_id: entity.catalog.as_ref().map(|c| c.id.clone()),
            display_full: false,
        };

        let mut doc = OutputDocument::new(header);
        doc.claim_section(link_section(
            SectionKind::PrimaryLinks,
            FieldGroup::PrimaryLinks,
            entity,
        ));
        doc.claim_section(link_section(
            SectionKind::SecondaryLinks,
            FieldGroup::SecondaryLinks,
            entity,
        ));
        doc.claim_section(link_section(
            SectionKind::SocialLinks,
            FieldGroup::SocialLinks,
            entity,
        ));
        doc.claim_section(text_section(SectionKind::Info, Field::Description, entity));
        doc.claim_section(text_section(SectionKind::Tracklist, Field::Tracklist, entity));
        doc.claim_section(text_section(SectionKind::Credits, Field::Credits, entity));
        doc.claim_section(text_section(SectionKind::Notes, Field::Notes, entity));

        debug!(
            "Assembled {} sections for {} ({} fields unavailable)",
            doc.sections().len(),
            identity,
            entity.unavailable().len()
        );
        Ok(doc)
    }

    /// Fills enrichment sections from deep-enrichment details.
    ///
    /// A section already holding real content is left alone. Returns the
    /// kinds that were filled.
    pub fn apply_details(&self, doc: &mut OutputDocument, details: &ReleaseDetails) -> Vec<SectionKind> {
        let mut filled = Vec::new();

        let tracklist: Vec<String> = details.tracklist.iter().map(|t| t.line()).collect();
        if !tracklist.is_empty()
            && doc.claim_section(Section::new(
                SectionKind::Tracklist,
                Some(Field::Tracklist.label()),
                tracklist,
            ))
        {
            filled.push(SectionKind::Tracklist);
        }

        let credits: Vec<String> = details.credits.iter().map(|c| c.line()).collect();
        if !credits.is_empty()
            && doc.claim_section(Section::new(
                SectionKind::Credits,
                Some(Field::Credits.label()),
                credits,
            ))
        {
            filled.push(SectionKind::Credits);
        }

        if let Some(notes) = &details.notes {
            let lines = notes.lines().map(str::to_string).collect();
            if doc.claim_section(Section::new(
                SectionKind::Notes,
                Some(Field::Notes.label()),
                lines,
            )) {
                filled.push(SectionKind::Notes);
            }
        }

        filled
    }

    /// Applies the length heuristic. Returns whether images should be attached.
    pub fn apply_length_heuristic(&self, doc: &mut OutputDocument) -> bool {
        let lines = doc.body_line_count();
        let short = lines < self.display_full_threshold;
        doc.header.display_full = short;
        info!(
            "Body has {} lines (threshold {}): {}",
            lines,
            self.display_full_threshold,
            if short { "display in full" } else { "attaching images" }
        );
        !short
    }

    /// Adds the gallery and the read-more marker after the first link block.
    pub fn attach_images(&self, doc: &mut OutputDocument, images: &[String]) {
        let alt = format!("{} - {}", doc.header.artist, doc.header.title);
        let lines: Vec<String> = doc
            .header
            .cover
            .iter()
            .chain(images)
            .unique()
            .map(|image| format!("![{alt}]({image})"))
            .collect();

        doc.claim_section(Section::new(
            SectionKind::ReadMore,
            None,
            vec![READ_MORE.to_string()],
        ));
        if !lines.is_empty() {
            doc.claim_section(Section::new(SectionKind::Gallery, Some("Gallery"), lines));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::Source;
    use crate::testing::sample_item;
    use shared::details::{Credit, TrackEntry};
    use shared::identity::ReleaseIdentity;

    fn entity() -> ResolvedEntity {
        let item = sample_item("42", "Slowdive", "Souvlaki");
        let mut entity = ResolvedEntity::new(item.identity(), Some(item));
        entity.resolve(
            Field::Spotify,
            "https://open.spotify.com/album/1".into(),
            Source::ReleaseCache,
        );
        entity.resolve(Field::Year, "1993".into(), Source::Catalog);
        entity.resolve(Field::Genres, "Rock, Shoegaze".into(), Source::Catalog);
        entity.resolve(
            Field::Cover,
            "https://i.discogs.com/cover.jpg".into(),
            Source::Catalog,
        );
        entity
    }

    fn details(tracks: usize) -> ReleaseDetails {
        ReleaseDetails {
            tracklist: (1..=tracks)
                .map(|i| TrackEntry {
                    position: i.to_string(),
                    title: format!("Track {i}"),
                    duration: None,
                })
                .collect(),
            credits: vec![Credit {
                name: "Ed Buller".into(),
                role: "Producer".into(),
            }],
            notes: None,
            images: vec!["https://i.discogs.com/back.jpg".into()],
        }
    }

    #[test]
    fn unavailable_links_become_placeholders() {
        let doc = ContentAssembler::default()
            .assemble(&entity(), Utc::now())
            .unwrap();
        let links = doc.section(SectionKind::PrimaryLinks).unwrap();
        assert!(links
            .lines
            .contains(&"[Spotify](https://open.spotify.com/album/1)".to_string()));
        assert!(links
            .lines
            .contains(&"<!-- [Deezer](): Slowdive - Souvlaki -->".to_string()));
        assert_eq!(doc.header.tags, vec!["Rock", "Shoegaze"]);
        assert_eq!(doc.header.catalog_id.as_deref(), Some("42"));
    }

    #[test]
    fn fixed_section_order() {
        let doc = ContentAssembler::default()
            .assemble(&entity(), Utc::now())
            .unwrap();
        let kinds: Vec<SectionKind> = doc.sections().iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SectionKind::PrimaryLinks,
                SectionKind::SecondaryLinks,
                SectionKind::SocialLinks,
                SectionKind::Info,
                SectionKind::Tracklist,
                SectionKind::Credits,
                SectionKind::Notes,
            ]
        );
        assert!(doc.section(SectionKind::Tracklist).unwrap().placeholder);
    }

    #[test]
    fn cached_tracklist_wins_over_enrichment() {
        let mut entity = entity();
        entity.resolve(Field::Tracklist, "1. Alison\n2. Machine Gun".into(), Source::ReleaseCache);
        let assembler = ContentAssembler::default();
        let mut doc = assembler.assemble(&entity, Utc::now()).unwrap();

        let filled = assembler.apply_details(&mut doc, &details(10));
        assert_eq!(filled, vec![SectionKind::Credits]);
        assert_eq!(
            doc.section(SectionKind::Tracklist).unwrap().lines,
            vec!["1. Alison", "2. Machine Gun"]
        );
        let headings = doc
            .sections()
            .iter()
            .filter(|s| s.heading.as_deref() == Some("Tracklist"))
            .count();
        assert_eq!(headings, 1);
    }

    #[test]
    fn short_body_is_displayed_in_full_without_images() {
        let entity = ResolvedEntity::new(ReleaseIdentity::new("Foo", "Bar"), None);
        let assembler = ContentAssembler::new(25);
        let mut doc = assembler.assemble(&entity, Utc::now()).unwrap();
        assembler.apply_details(
            &mut doc,
            &ReleaseDetails {
                tracklist: details(9).tracklist,
                ..Default::default()
            },
        );
        // Nine tracks plus the heading.
        assert_eq!(doc.body_line_count(), 10);

        assert!(!assembler.apply_length_heuristic(&mut doc));
        assert!(doc.header.display_full);
        assert!(doc.section(SectionKind::Gallery).is_none());
        assert!(doc.section(SectionKind::ReadMore).is_none());
    }

    #[test]
    fn long_body_gets_a_gallery_and_read_more_marker() {
        let assembler = ContentAssembler::new(25);
        let mut doc = assembler.assemble(&entity(), Utc::now()).unwrap();
        assembler.apply_details(&mut doc, &details(30));

        assert!(assembler.apply_length_heuristic(&mut doc));
        assert!(!doc.header.display_full);
        assembler.attach_images(&mut doc, &details(0).images);

        let kinds: Vec<SectionKind> = doc.sections().iter().map(|s| s.kind).collect();
        assert_eq!(kinds[1], SectionKind::ReadMore);
        assert_eq!(*kinds.last().unwrap(), SectionKind::Gallery);
        assert_eq!(doc.section(SectionKind::Gallery).unwrap().lines.len(), 2);
    }
}
