//! Content-URL extraction from asset descriptor XML.
//!
//! A finished decal's descriptor is the legacy Roblox XML model file. The
//! direct image reference lives at `Item > Properties > Content > url`. We
//! only need that one value, so a regex over the `Content` element is
//! sufficient; a failed extraction degrades to the raw asset id upstream.

use std::sync::OnceLock;

use regex::Regex;

fn content_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // <Content name="Texture"><url>http://...</url></Content>
        Regex::new(r"(?s)<Content\b[^>]*>.*?<url>\s*([^<]+?)\s*</url>")
            .expect("content url regex is valid")
    })
}

/// Extract the embedded content URL from a descriptor payload.
///
/// Returns `None` when the payload carries no `Content` url, which callers
/// treat as "keep the unresolved identifier".
pub fn extract_content_url(xml: &str) -> Option<String> {
    content_url_regex()
        .captures(xml)
        .map(|caps| caps[1].to_string())
        .filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"<roblox version="4">
  <Item class="Decal" referent="RBX0">
    <Properties>
      <Content name="Texture">
        <url>http://www.roblox.com/asset/?id=987654321</url>
      </Content>
      <string name="Name">sprite-sheet-0</string>
    </Properties>
  </Item>
</roblox>"#;

    #[test]
    fn test_extracts_content_url() {
        assert_eq!(
            extract_content_url(DESCRIPTOR).as_deref(),
            Some("http://www.roblox.com/asset/?id=987654321")
        );
    }

    #[test]
    fn test_missing_content_yields_none() {
        assert_eq!(extract_content_url("<roblox></roblox>"), None);
        assert_eq!(extract_content_url(""), None);
    }

    #[test]
    fn test_non_xml_yields_none() {
        assert_eq!(extract_content_url("{\"error\":\"denied\"}"), None);
    }

    #[test]
    fn test_url_outside_content_is_ignored() {
        let xml = "<roblox><url>http://stray</url></roblox>";
        assert_eq!(extract_content_url(xml), None);
    }
}
