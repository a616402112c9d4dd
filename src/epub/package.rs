//! OPF package document metadata.

use anyhow::{Context, Result, anyhow, bail};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// A name with its optional `file-as` sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortableName {
    pub name: String,
    pub file_as: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub name: String,
    pub file_as: Option<String>,
    pub role: Option<String>,
    pub role_scheme: Option<String>,
    pub display_seq: Option<u32>,
}

/// Bibliographic metadata extracted from an OPF package document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSummary {
    pub title: SortableName,
    /// Ordered by `display-seq`; creators without one come first.
    pub creators: Vec<Creator>,
    pub publisher: Option<SortableName>,
    pub language: String,
    /// Raw `dcterms:modified` value.
    pub modified: Option<String>,
    pub subjects: Vec<String>,
    pub description: Option<String>,
}

/// A direct child of `<metadata>`.
#[derive(Debug, Default)]
struct MetadataItem {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
}

impl MetadataItem {
    fn from_start(element: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(element.local_name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in element.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr.unescape_value()?.trim().to_string();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            text: String::new(),
        })
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn value(&self) -> String {
        self.text.trim().to_string()
    }
}

/// Collect the children of the package's `<metadata>` element.
fn collect_metadata(xml: &str) -> Result<Vec<MetadataItem>> {
    let mut reader = Reader::from_str(xml);

    let mut items = Vec::new();
    let mut in_metadata = false;
    // Depth below <metadata> of the current element.
    let mut depth = 0usize;
    let mut current: Option<MetadataItem> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if !in_metadata {
                    in_metadata = e.local_name().as_ref() == b"metadata";
                } else {
                    depth += 1;
                    if depth == 1 {
                        current = Some(MetadataItem::from_start(&e)?);
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                if in_metadata && depth == 0 {
                    items.push(MetadataItem::from_start(&e)?);
                }
            }
            Ok(Event::End(_)) => {
                if in_metadata {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    if depth == 0 {
                        items.extend(current.take());
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(item) = current.as_mut() {
                    item.text.push_str(&e.unescape()?);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(item) = current.as_mut() {
                    item.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => bail!("package document is not well-formed XML: {e}"),
        }
    }

    if !in_metadata {
        bail!("package document has no metadata element");
    }
    Ok(items)
}

/// EPUB 3 `<meta refines="#id" property="...">` lookups.
struct Refinements<'a> {
    metas: Vec<&'a MetadataItem>,
}

impl<'a> Refinements<'a> {
    fn new(items: &'a [MetadataItem]) -> Self {
        let metas = items.iter().filter(|item| item.name == "meta").collect();
        Self { metas }
    }

    /// The first refinement of `target` with the given property.
    fn find(&self, target: &MetadataItem, property: &str) -> Option<&'a MetadataItem> {
        let id = target.attr("id")?;
        self.metas.iter().copied().find(|meta| {
            meta.attr("refines")
                .and_then(|r| r.strip_prefix('#'))
                .is_some_and(|r| r == id)
                && meta.attr("property") == Some(property)
        })
    }

    fn value(&self, target: &MetadataItem, property: &str) -> Option<String> {
        self.find(target, property).map(MetadataItem::value)
    }

    /// A package-level `<meta property="...">` with no `refines`.
    fn global(&self, property: &str) -> Option<String> {
        self.metas
            .iter()
            .find(|meta| meta.attr("refines").is_none() && meta.attr("property") == Some(property))
            .map(|meta| meta.value())
    }
}

/// Parse the metadata section of an OPF package document.
pub fn parse_package_document(xml: &str) -> Result<PackageSummary> {
    let items = collect_metadata(xml)?;
    let refinements = Refinements::new(&items);
    let elements = |name: &'static str| items.iter().filter(move |item| item.name == name);

    let title = parse_title(elements("title").collect(), &refinements)?;

    let mut creators = elements("creator")
        .map(|creator| -> Result<Creator> {
            let display_seq = refinements
                .value(creator, "display-seq")
                .map(|seq| {
                    seq.parse::<u32>()
                        .with_context(|| format!("invalid display-seq {seq:?}"))
                })
                .transpose()?;
            let role = refinements.find(creator, "role");
            Ok(Creator {
                name: creator.value(),
                file_as: refinements
                    .value(creator, "file-as")
                    .or_else(|| creator.attr("file-as").map(str::to_string)),
                role: role
                    .map(MetadataItem::value)
                    .or_else(|| creator.attr("role").map(str::to_string)),
                role_scheme: role.and_then(|r| r.attr("scheme")).map(str::to_string),
                display_seq,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    creators.sort_by_key(|creator| creator.display_seq);

    let publisher = elements("publisher").next().map(|publisher| SortableName {
        name: publisher.value(),
        file_as: refinements.value(publisher, "file-as"),
    });

    let language = elements("language")
        .next()
        .map(MetadataItem::value)
        .ok_or_else(|| anyhow!("package document has no dc:language"))?;

    let subjects = elements("subject")
        .flat_map(|subject| {
            subject
                .value()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        })
        .collect();

    Ok(PackageSummary {
        title,
        creators,
        publisher,
        language,
        modified: refinements.global("dcterms:modified"),
        subjects,
        description: elements("description").next().map(MetadataItem::value),
    })
}

/// One title, or a main title and a subtitle distinguished by `title-type`.
fn parse_title(titles: Vec<&MetadataItem>, refinements: &Refinements<'_>) -> Result<SortableName> {
    let named = |item: &MetadataItem| SortableName {
        name: item.value(),
        file_as: refinements.value(item, "file-as"),
    };

    match titles.as_slice() {
        [] => bail!("package document has no dc:title"),
        [only] => Ok(named(only)),
        [first, second] => {
            let kinds = (
                refinements.value(first, "title-type"),
                refinements.value(second, "title-type"),
            );
            let (main, sub) = match kinds {
                (Some(a), Some(b)) if a == "main" && b == "subtitle" => (first, second),
                (Some(a), Some(b)) if a == "subtitle" && b == "main" => (second, first),
                (Some(a), Some(b)) => bail!("unknown dc:title title-type pair ({a}, {b})"),
                _ => bail!("two dc:title elements without title-type refinements"),
            };
            let (main, sub) = (named(main), named(sub));
            let file_as = match (main.file_as, sub.file_as) {
                (Some(a), Some(b)) => Some(format!("{a} {b}")),
                (a, b) => a.or(b),
            };
            Ok(SortableName {
                name: format!("{} {}", main.name, sub.name),
                file_as,
            })
        }
        _ => bail!("package document has {} dc:title elements", titles.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:1234</dc:identifier>
    <dc:title id="sub">A Subtitle</dc:title>
    <meta refines="#sub" property="title-type">subtitle</meta>
    <dc:title id="main">Main &amp; Title</dc:title>
    <meta refines="#main" property="title-type">main</meta>
    <meta refines="#main" property="file-as">MAIN TITLE</meta>
    <dc:creator id="c2">Second Author</dc:creator>
    <meta refines="#c2" property="display-seq">2</meta>
    <dc:creator id="c1">First Author</dc:creator>
    <meta refines="#c1" property="display-seq">1</meta>
    <meta refines="#c1" property="role" scheme="marc:relators">aut</meta>
    <meta refines="#c1" property="file-as">Author, First</meta>
    <dc:publisher id="pub">Some House</dc:publisher>
    <meta refines="#pub" property="file-as">HOUSE</meta>
    <dc:language>ja</dc:language>
    <dc:subject>Fiction, Mystery</dc:subject>
    <dc:description><![CDATA[<p>Blurb</p>]]></dc:description>
    <meta property="dcterms:modified">2024-01-02T03:04:05Z</meta>
  </metadata>
  <manifest/>
</package>"##;

    #[test]
    fn parses_full_summary() {
        let summary = parse_package_document(OPF).unwrap();

        assert_eq!(summary.title.name, "Main & Title A Subtitle");
        assert_eq!(summary.title.file_as.as_deref(), Some("MAIN TITLE"));

        let names: Vec<_> = summary.creators.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["First Author", "Second Author"]);
        assert_eq!(summary.creators[0].role.as_deref(), Some("aut"));
        assert_eq!(summary.creators[0].role_scheme.as_deref(), Some("marc:relators"));
        assert_eq!(summary.creators[0].file_as.as_deref(), Some("Author, First"));
        assert_eq!(summary.creators[1].display_seq, Some(2));

        let publisher = summary.publisher.unwrap();
        assert_eq!(publisher.name, "Some House");
        assert_eq!(publisher.file_as.as_deref(), Some("HOUSE"));

        assert_eq!(summary.language, "ja");
        assert_eq!(summary.modified.as_deref(), Some("2024-01-02T03:04:05Z"));
        assert_eq!(summary.subjects, ["Fiction", "Mystery"]);
        assert_eq!(summary.description.as_deref(), Some("<p>Blurb</p>"));
    }

    #[test]
    fn epub2_single_title() {
        let opf = r#"<package><metadata>
            <dc:title>Plain</dc:title>
            <dc:creator opf:file-as="Doe, Jane" opf:role="aut">Jane Doe</dc:creator>
            <dc:language>en</dc:language>
        </metadata></package>"#;
        let summary = parse_package_document(opf).unwrap();

        assert_eq!(summary.title.name, "Plain");
        assert_eq!(summary.creators[0].file_as.as_deref(), Some("Doe, Jane"));
        assert_eq!(summary.creators[0].role.as_deref(), Some("aut"));
        assert!(summary.publisher.is_none());
        assert!(summary.subjects.is_empty());
    }

    #[test]
    fn unsequenced_creators_come_first() {
        let opf = r##"<package><metadata>
            <dc:title>T</dc:title>
            <dc:creator id="a">Sequenced</dc:creator>
            <meta refines="#a" property="display-seq">1</meta>
            <dc:creator>Loose</dc:creator>
            <dc:language>en</dc:language>
        </metadata></package>"##;
        let summary = parse_package_document(opf).unwrap();
        let names: Vec<_> = summary.creators.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Loose", "Sequenced"]);
    }

    #[test]
    fn title_errors() {
        let missing = "<package><metadata><dc:language>en</dc:language></metadata></package>";
        assert!(parse_package_document(missing).is_err());

        let untyped = "<package><metadata><dc:title>A</dc:title><dc:title>B</dc:title>\
                       <dc:language>en</dc:language></metadata></package>";
        assert!(parse_package_document(untyped).is_err());

        let three = "<package><metadata><dc:title>A</dc:title><dc:title>B</dc:title>\
                     <dc:title>C</dc:title><dc:language>en</dc:language></metadata></package>";
        assert!(parse_package_document(three).is_err());
    }

    #[test]
    fn language_is_required() {
        let opf = "<package><metadata><dc:title>A</dc:title></metadata></package>";
        let err = parse_package_document(opf).unwrap_err();
        assert!(err.to_string().contains("dc:language"));
    }

    #[test]
    fn bad_display_seq_is_an_error() {
        let opf = r##"<package><metadata>
            <dc:title>T</dc:title>
            <dc:creator id="a">X</dc:creator>
            <meta refines="#a" property="display-seq">first</meta>
            <dc:language>en</dc:language>
        </metadata></package>"##;
        assert!(parse_package_document(opf).is_err());
    }
}
