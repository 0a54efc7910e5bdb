use kestrel_core::AppError;
use kestrel_core::profile::{Accessor, FieldChain, RatingRule, SiteProfile, render_search_url};
use regex::Regex;
use scraper::{ElementRef, Selector};
use url::Url;

/// One compiled step of a fallback chain.
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    selector: Option<Selector>,
    accessor: Accessor,
}

impl CompiledRule {
    fn read(&self, container: ElementRef<'_>) -> Option<String> {
        let node = match &self.selector {
            Some(selector) => container.select(selector).next()?,
            None => container,
        };
        let value = match &self.accessor {
            Accessor::Text => collapsed_text(node),
            Accessor::Attr(name) => node.value().attr(name)?.trim().to_string(),
            Accessor::AttrOrText(name) => match node.value().attr(name).map(str::trim) {
                Some(v) if !v.is_empty() => v.to_string(),
                _ => collapsed_text(node),
            },
        };
        (!value.is_empty()).then_some(value)
    }
}

/// Inner text with runs of whitespace collapsed to one space.
fn collapsed_text(node: ElementRef<'_>) -> String {
    let raw: String = node.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compiled fallback chain: the first rule yielding a non-empty value wins.
#[derive(Debug, Clone, Default)]
pub(crate) struct CompiledChain(Vec<CompiledRule>);

impl CompiledChain {
    fn compile(field: &str, chain: &FieldChain) -> Result<Self, AppError> {
        chain
            .iter()
            .map(|rule| {
                let selector = rule
                    .selector
                    .as_deref()
                    .map(|s| parse_selector(field, s))
                    .transpose()?;
                Ok(CompiledRule {
                    selector,
                    accessor: rule.accessor.clone(),
                })
            })
            .collect::<Result<Vec<_>, AppError>>()
            .map(Self)
    }

    pub(crate) fn resolve(&self, container: ElementRef<'_>) -> Option<String> {
        self.0.iter().find_map(|rule| rule.read(container))
    }
}

#[derive(Debug, Clone)]
pub(crate) enum CompiledRating {
    Stars {
        containers: Vec<Selector>,
        filled: Selector,
        half: Selector,
    },
    Text {
        chain: CompiledChain,
        pattern: Regex,
    },
}

/// A [`SiteProfile`] with every selector and pattern parsed.
///
/// Compilation is the only place a profile can fail; extraction
/// itself never errors.
#[derive(Debug, Clone)]
pub struct CompiledProfile {
    pub name: String,
    pub base_url: String,
    search_url: String,
    pub(crate) containers: Vec<(String, Selector)>,
    pub(crate) title: CompiledChain,
    pub(crate) price: CompiledChain,
    pub(crate) sold_count: CompiledChain,
    pub(crate) review_count: CompiledChain,
    pub(crate) location: CompiledChain,
    pub(crate) url: CompiledChain,
    pub(crate) identifier: CompiledChain,
    pub(crate) rating: CompiledRating,
    pub(crate) sold_pattern: Regex,
    pub(crate) review_pattern: Regex,
    pub(crate) identifier_link_pattern: Option<Regex>,
    pub(crate) min_title_len: usize,
}

impl CompiledProfile {
    pub fn compile(profile: &SiteProfile) -> Result<Self, AppError> {
        let base = Url::parse(&profile.base_url).map_err(|e| {
            AppError::ProfileError(format!("Invalid base_url '{}': {e}", profile.base_url))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::ProfileError(format!(
                "base_url '{}' must be http or https",
                profile.base_url
            )));
        }
        if !profile.search_url.contains("{query}") {
            return Err(AppError::ProfileError(format!(
                "search_url '{}' has no {{query}} placeholder",
                profile.search_url
            )));
        }
        if profile.containers.is_empty() {
            return Err(AppError::ProfileError(format!(
                "Profile '{}' has no container selectors",
                profile.name
            )));
        }

        let containers = profile
            .containers
            .iter()
            .map(|s| parse_selector("containers", s).map(|sel| (s.clone(), sel)))
            .collect::<Result<Vec<_>, _>>()?;

        let fields = &profile.fields;
        let rating = match &profile.rating {
            RatingRule::Stars {
                containers,
                filled,
                half,
            } => CompiledRating::Stars {
                containers: containers
                    .iter()
                    .map(|s| parse_selector("rating", s))
                    .collect::<Result<_, _>>()?,
                filled: parse_selector("rating", filled)?,
                half: parse_selector("rating", half)?,
            },
            RatingRule::Text { chain, pattern } => CompiledRating::Text {
                chain: CompiledChain::compile("rating", chain)?,
                pattern: parse_pattern("rating", pattern)?,
            },
        };

        Ok(Self {
            name: profile.name.clone(),
            base_url: profile.base_url.trim_end_matches('/').to_string(),
            search_url: profile.search_url.clone(),
            containers,
            title: CompiledChain::compile("title", &fields.title)?,
            price: CompiledChain::compile("price", &fields.price)?,
            sold_count: CompiledChain::compile("sold_count", &fields.sold_count)?,
            review_count: CompiledChain::compile("review_count", &fields.review_count)?,
            location: CompiledChain::compile("location", &fields.location)?,
            url: CompiledChain::compile("url", &fields.url)?,
            identifier: CompiledChain::compile("identifier", &fields.identifier)?,
            rating,
            sold_pattern: parse_pattern("sold_pattern", &profile.sold_pattern)?,
            review_pattern: parse_pattern("review_pattern", &profile.review_pattern)?,
            identifier_link_pattern: profile
                .identifier_link_pattern
                .as_deref()
                .map(|p| parse_pattern("identifier_link_pattern", p))
                .transpose()?,
            min_title_len: profile.min_title_len,
        })
    }

    pub fn search_url_for(&self, query: &str) -> String {
        render_search_url(&self.search_url, query)
    }
}

fn parse_selector(field: &str, selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector).map_err(|e| {
        AppError::ProfileError(format!("Invalid {field} selector '{selector}': {e}"))
    })
}

/// Compile a pattern that must expose the value in capture group 1.
fn parse_pattern(field: &str, pattern: &str) -> Result<Regex, AppError> {
    let regex = Regex::new(pattern)
        .map_err(|e| AppError::ProfileError(format!("Invalid {field} '{pattern}': {e}")))?;
    if regex.captures_len() < 2 {
        return Err(AppError::ProfileError(format!(
            "{field} '{pattern}' needs a capture group"
        )));
    }
    Ok(regex)
}

#[cfg(test)]
mod tests {
    use kestrel_core::profile::FieldRule;
    use scraper::Html;

    use super::*;
    use crate::sites;

    fn chain(rules: Vec<FieldRule>) -> CompiledChain {
        CompiledChain::compile("test", &rules).unwrap()
    }

    fn first_div(doc: &Html) -> ElementRef<'_> {
        doc.select(&Selector::parse("div.c").unwrap()).next().unwrap()
    }

    #[test]
    fn chain_falls_back_to_later_rules() {
        let doc = Html::parse_fragment(r#"<div class="c"><span class="b">second</span></div>"#);
        let c = chain(vec![
            FieldRule::new("span.a", Accessor::Text),
            FieldRule::new("span.b", Accessor::Text),
        ]);
        assert_eq!(c.resolve(first_div(&doc)).as_deref(), Some("second"));
    }

    #[test]
    fn chain_skips_empty_values() {
        let doc = Html::parse_fragment(
            r#"<div class="c"><span class="a">   </span><span class="b">x</span></div>"#,
        );
        let c = chain(vec![
            FieldRule::new("span.a", Accessor::Text),
            FieldRule::new("span.b", Accessor::Text),
        ]);
        assert_eq!(c.resolve(first_div(&doc)).as_deref(), Some("x"));
    }

    #[test]
    fn attr_or_text_prefers_attribute() {
        let doc = Html::parse_fragment(
            r#"<div class="c"><a title="Full untruncated title">Full untr...</a><b title="">text only</b></div>"#,
        );
        let attr_first = chain(vec![FieldRule::new("a", Accessor::AttrOrText("title".into()))]);
        assert_eq!(
            attr_first.resolve(first_div(&doc)).as_deref(),
            Some("Full untruncated title")
        );
        let empty_attr = chain(vec![FieldRule::new("b", Accessor::AttrOrText("title".into()))]);
        assert_eq!(empty_attr.resolve(first_div(&doc)).as_deref(), Some("text only"));
    }

    #[test]
    fn container_rule_reads_container_attribute() {
        let doc = Html::parse_fragment(r#"<div class="c" data-id=" 42 "></div>"#);
        let c = chain(vec![FieldRule::on_container(Accessor::Attr("data-id".into()))]);
        assert_eq!(c.resolve(first_div(&doc)).as_deref(), Some("42"));
    }

    #[test]
    fn text_whitespace_is_collapsed() {
        let doc = Html::parse_fragment("<div class=\"c\"><p>Rs.\n   59,990 <i>only</i></p></div>");
        let c = chain(vec![FieldRule::new("p", Accessor::Text)]);
        assert_eq!(c.resolve(first_div(&doc)).as_deref(), Some("Rs. 59,990 only"));
    }

    #[test]
    fn rejects_invalid_selector() {
        let mut profile = sites::daraz();
        profile.fields.price = vec![FieldRule::new("span[", Accessor::Text)];
        let err = CompiledProfile::compile(&profile).unwrap_err();
        assert!(matches!(err, AppError::ProfileError(_)));
        assert!(err.to_string().contains("price"));
    }

    #[test]
    fn rejects_pattern_without_capture_group() {
        let mut profile = sites::daraz();
        profile.sold_pattern = r"\d+ sold".to_string();
        let err = CompiledProfile::compile(&profile).unwrap_err();
        assert!(err.to_string().contains("capture group"));
    }

    #[test]
    fn rejects_relative_base_url_and_missing_placeholder() {
        let mut profile = sites::daraz();
        profile.base_url = "/relative".to_string();
        assert!(CompiledProfile::compile(&profile).is_err());

        let mut profile = sites::daraz();
        profile.search_url = "https://www.daraz.com.np/catalog/".to_string();
        assert!(CompiledProfile::compile(&profile).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let mut profile = sites::daraz();
        profile.base_url = "https://www.daraz.com.np/".to_string();
        let compiled = CompiledProfile::compile(&profile).unwrap();
        assert_eq!(compiled.base_url, "https://www.daraz.com.np");
    }

    #[test]
    fn search_url_is_form_encoded() {
        let compiled = CompiledProfile::compile(&sites::daraz()).unwrap();
        assert_eq!(
            compiled.search_url_for("samsung smart tv"),
            "https://www.daraz.com.np/catalog/?q=samsung+smart+tv"
        );
    }
}
