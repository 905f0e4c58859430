use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::extract::collapse_whitespace;
use crate::types::BulletinReference;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to parse URL: {0}")]
    UrlParse(String),
    #[error("Failed to parse date: {0}")]
    DateParse(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

static RE_LISTING_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{4}-[0-9]{2}-[0-9]{2}").expect("invalid regex: listing date")
});

const FEATURED_ENTRY: &str = ".main .cn-main .cn-main-right .item-top .item-top-text";
const REMAINING_ENTRIES: &str = ".main .cn-main .cn-main-right .item-top .item-bottom ul li";
const BULLETIN_PARAGRAPHS: &str = ".TRS_Editor .TRS_Editor p";

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector '{css}': {e}"))
}

/// Parses the bulletin list page: the featured entry first, then the
/// remaining entries in page order.
///
/// The page layout is assumed stable, so a missing featured entry or an
/// entry without link or date fails the whole list.
pub fn parse_bulletin_list(html: &str, base_url: &str) -> Result<Vec<BulletinReference>, ParseError> {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url)
        .map_err(|e| ParseError::UrlParse(format!("{base_url}: {e}")))?;

    let featured = document
        .select(&selector(FEATURED_ENTRY))
        .next()
        .ok_or_else(|| ParseError::MissingField("featured bulletin entry".to_string()))?;
    let remaining_selector = selector(REMAINING_ENTRIES);

    std::iter::once(featured)
        .chain(document.select(&remaining_selector))
        .map(|entry| parse_bulletin_entry(entry, &base))
        .collect()
}

fn parse_bulletin_entry(entry: ElementRef, base: &Url) -> Result<BulletinReference, ParseError> {
    let anchor = entry
        .select(&selector("a"))
        .next()
        .ok_or_else(|| ParseError::MissingField("entry link".to_string()))?;

    let href = anchor
        .value()
        .attr("href")
        .ok_or_else(|| ParseError::MissingField("href attribute".to_string()))?;
    let link = base
        .join(href)
        .map_err(|e| ParseError::UrlParse(format!("{href}: {e}")))?
        .to_string();

    let title = elem_text(anchor).trim().to_string();

    let date_text = entry
        .select(&selector("a + span"))
        .next()
        .map(elem_text)
        .ok_or_else(|| ParseError::MissingField(format!("date for '{title}'")))?;
    let date = RE_LISTING_DATE
        .find(date_text.trim())
        .ok_or_else(|| ParseError::DateParse(format!("No date in '{}'", date_text.trim())))?
        .as_str()
        .to_string();

    Ok(BulletinReference { title, date, link })
}

/// Returns the bulletin body paragraphs with all whitespace removed.
pub fn parse_bulletin_paragraphs(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(&selector(BULLETIN_PARAGRAPHS))
        .map(|p| collapse_whitespace(&elem_text(p)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LIST_URL: &str = "https://www.chinacdc.cn/jkzt/crb/zl/szkb_11803/jszl_13141/";

    #[test]
    fn test_parse_bulletin_list_from_fixture() {
        let html = fs::read_to_string("fixtures/bulletin_list.html")
            .expect("Failed to read fixture");

        let posts = parse_bulletin_list(&html, LIST_URL).expect("Failed to parse bulletin list");

        assert_eq!(posts.len(), 3);

        let first = &posts[0];
        assert_eq!(first.title, "全国新型冠状病毒感染疫情情况");
        assert_eq!(first.date, "2023-02-01");
        assert_eq!(
            first.link,
            "https://www.chinacdc.cn/jkzt/crb/zl/szkb_11803/jszl_13141/202302/t20230201_263576.html"
        );

        assert_eq!(posts[1].date, "2023-01-25");
        assert_eq!(
            posts[2].link,
            "https://www.chinacdc.cn/jkzt/crb/zl/szkb_11803/jszl_13141/202301/t20230118_263402.html"
        );
    }

    #[test]
    fn test_parse_bulletin_list_without_featured_entry() {
        let html = r#"
            <div class="main"><div class="cn-main"><div class="cn-main-right">
                <div class="item-top">
                    <div class="item-bottom"><ul>
                        <li><a href="./202301/t1.html">疫情情况</a><span>2023-01-18</span></li>
                    </ul></div>
                </div>
            </div></div></div>
        "#;

        let err = parse_bulletin_list(html, LIST_URL).expect_err("Should fail");
        assert!(matches!(err, ParseError::MissingField(_)));
    }

    #[test]
    fn test_parse_bulletin_list_rejects_entry_without_date() {
        let html = r#"
            <div class="main"><div class="cn-main"><div class="cn-main-right">
                <div class="item-top">
                    <div class="item-top-text"><a href="./202302/t1.html">疫情情况</a><span>最新</span></div>
                </div>
            </div></div></div>
        "#;

        let err = parse_bulletin_list(html, LIST_URL).expect_err("Should fail");
        assert!(matches!(err, ParseError::DateParse(_)));
    }

    #[test]
    fn test_parse_bulletin_list_keeps_date_text_as_matched() {
        let html = r#"
            <div class="main"><div class="cn-main"><div class="cn-main-right">
                <div class="item-top">
                    <div class="item-top-text"><a href="./202302/t1.html">疫情情况</a><span>[2023-02-30]</span></div>
                </div>
            </div></div></div>
        "#;

        let posts = parse_bulletin_list(html, LIST_URL).expect("Failed to parse");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].date, "2023-02-30");
    }

    #[test]
    fn test_parse_bulletin_paragraphs_from_fixture() {
        let html = fs::read_to_string("fixtures/bulletin_detail.html")
            .expect("Failed to read fixture");

        let paragraphs = parse_bulletin_paragraphs(&html);

        assert_eq!(paragraphs.len(), 3);
        assert_eq!(paragraphs[0], "一、全国发热门诊（诊室）哨点监测情况");
        assert!(paragraphs[1].starts_with("1月23日"));
        assert!(!paragraphs.iter().any(|p| p.contains(char::is_whitespace)));
        assert!(paragraphs[1].contains("检测阳性率"));
    }
}
