use serde::Serialize;
use std::fmt::Write;

use crate::error::{Result, SleeveError};

pub const READ_MORE: &str = "<!--more-->";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub title: String,
    pub artist: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub year: Option<String>,
    pub label: Option<String>,
    pub tags: Vec<String>,
    pub cover: Option<String>,
    pub catalog_id: Option<String>,
    /// Short documents are shown in full on listing pages.
    pub display_full: bool,
}

impl Header {
    /// Cleans up the header before rendering.
    ///
    /// Tags are trimmed, lower-cased and deduplicated in order. An empty
    /// title or artist cannot be published.
    pub fn normalize(&mut self) -> Result<()> {
        self.title = self.title.trim().to_string();
        self.artist = self.artist.trim().to_string();
        if self.title.is_empty() || self.artist.is_empty() {
            return Err(SleeveError::Assembly(
                "header needs both an artist and a title".into(),
            ));
        }

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            let tag = tag.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        self.tags = tags;

        self.label = self.label.take().filter(|l| !l.trim().is_empty());
        Ok(())
    }
}

#[derive(Serialize)]
struct FrontMatter<'a> {
    title: &'a str,
    date: &'a str,
    taxonomies: Taxonomies<'a>,
    extra: Extra<'a>,
}

#[derive(Serialize)]
struct Taxonomies<'a> {
    artists: [&'a str; 1],
    tags: &'a [String],
}

#[derive(Serialize)]
struct Extra<'a> {
    artist: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cover: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    catalog_id: Option<&'a str>,
    display_full: bool,
}

/// Section kinds in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SectionKind {
    PrimaryLinks,
    ReadMore,
    SecondaryLinks,
    SocialLinks,
    Info,
    Tracklist,
    Credits,
    Notes,
    Gallery,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub kind: SectionKind,
    pub heading: Option<String>,
    pub lines: Vec<String>,
    /// Holds a commented-out stand-in until real content arrives
    pub placeholder: bool,
}

impl Section {
    pub fn new(kind: SectionKind, heading: Option<&str>, lines: Vec<String>) -> Self {
        Self {
            kind,
            heading: heading.map(str::to_string),
            lines,
            placeholder: false,
        }
    }

    pub fn placeholder(kind: SectionKind, heading: &str, comment: String) -> Self {
        Self {
            kind,
            heading: Some(heading.to_string()),
            lines: vec![comment],
            placeholder: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputDocument {
    pub header: Header,
    sections: Vec<Section>,
}

impl OutputDocument {
    pub fn new(header: Header) -> Self {
        Self {
            header,
            sections: Vec::new(),
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Places `section` at its position in document order.
    ///
    /// Returns `false`, leaving the document unchanged, when a section of the
    /// same kind already holds real content. A placeholder of that kind is
    /// replaced in place. Placeholders themselves never displace anything.
    pub fn claim_section(&mut self, section: Section) -> bool {
        if let Some(existing) = self.sections.iter_mut().find(|s| s.kind == section.kind) {
            if !existing.placeholder || section.placeholder {
                return false;
            }
            *existing = section;
            return true;
        }

        let at = self
            .sections
            .iter()
            .position(|s| s.kind > section.kind)
            .unwrap_or(self.sections.len());
        self.sections.insert(at, section);
        true
    }

    /// Lines a reader would see: placeholders, markers and blanks excluded.
    pub fn body_line_count(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| !s.placeholder && s.kind != SectionKind::ReadMore)
            .map(|s| {
                s.heading.iter().count()
                    + s.lines
                        .iter()
                        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with("<!--"))
                        .count()
            })
            .sum()
    }

    pub fn render(&self) -> Result<String> {
        let h = &self.header;
        let front = FrontMatter {
            title: &h.title,
            date: &h.date,
            taxonomies: Taxonomies {
                artists: [&h.artist],
                tags: &h.tags,
            },
            extra: Extra {
                artist: &h.artist,
                year: h.year.as_deref(),
                label: h.label.as_deref(),
                cover: h.cover.as_deref(),
                catalog_id: h.catalog_id.as_deref(),
                display_full: h.display_full,
            },
        };

        let mut out = String::from("+++\n");
        out.push_str(&toml::to_string(&front)?);
        // `[extra]` is the last table, so these stay inside it.
        let missing = [
            ("year", &h.year),
            ("label", &h.label),
            ("cover", &h.cover),
        ];
        for (key, _) in missing.iter().filter(|(_, value)| value.is_none()) {
            writeln!(out, "# {key} = \"\" # {} - {}", h.artist, h.title)
                .map_err(|e| SleeveError::Format(e.to_string()))?;
        }
        out.push_str("+++\n");

        for section in &self.sections {
            out.push('\n');
            if let Some(heading) = &section.heading {
                writeln!(out, "## {heading}\n").map_err(|e| SleeveError::Format(e.to_string()))?;
            }
            for line in &section.lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        Ok(out)
    }
}
