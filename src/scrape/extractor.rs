//! Turns a fetched disclosure page into a typed fund record.
//!
//! Every extracted value carries the page URL it came from; a value that
//! cannot be located or fails validation becomes a recorded miss, not a
//! fabricated default.

use chrono::Utc;
use scraper::Html;
use thiserror::Error;
use tracing::debug;

use crate::store::{FaqEntry, FundFact, FundRecord, Holding, PeerFund};

use super::fields::{self, PageText};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("required field '{0}' could not be extracted")]
    MissingField(&'static str),
    #[error("malformed page: {0}")]
    MalformedPage(String),
    #[error("unsupported page layout: {0}")]
    UnsupportedLayout(String),
}

/// Extraction result: the record plus the names of fields the page did not
/// yield. Misses are normal, they feed the scrape report.
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub record: FundRecord,
    pub misses: Vec<&'static str>,
}

/// Extracts a fund record from raw page HTML.
///
/// Fails with `MalformedPage` when the document has no visible text,
/// `MissingField` when no fund name can be resolved, and
/// `UnsupportedLayout` when a name resolves but nothing else does.
pub fn extract_fund(url: &str, html: &str) -> Result<ExtractionOutcome, ExtractionError> {
    if html.trim().is_empty() {
        return Err(ExtractionError::MalformedPage("empty document".to_string()));
    }

    let document = Html::parse_document(html);
    let text = PageText::new(&document);
    if text.is_blank() {
        return Err(ExtractionError::MalformedPage(
            "document has no visible text".to_string(),
        ));
    }

    let name = fields::extract_fund_name(&document, url)
        .ok_or(ExtractionError::MissingField("fund_name"))?;

    let now = Utc::now().to_rfc3339();
    let mut facts: Vec<FundFact> = Vec::new();
    let mut misses: Vec<&'static str> = Vec::new();

    let scalar_fields: [(&'static str, Option<String>); 13] = [
        ("expense_ratio", fields::percent_after(&text, &["expense ratio"])),
        ("exit_load", fields::text_after(&text, &["exit load"])),
        (
            "min_sip_amount",
            fields::currency_after(&text, &["min. sip amount", "minimum sip", "min sip"]),
        ),
        (
            "min_lumpsum",
            fields::currency_after(
                &text,
                &["min. lumpsum", "minimum lumpsum", "minimum investment", "min. investment"],
            ),
        ),
        (
            "return_1y",
            fields::return_after(&text, &["1y returns", "1 year returns", "1y return", "1y"]),
        ),
        (
            "return_3y",
            fields::return_after(&text, &["3y returns", "3 year returns", "3y return", "3y"]),
        ),
        (
            "return_5y",
            fields::return_after(&text, &["5y returns", "5 year returns", "5y return", "5y"]),
        ),
        ("fund_manager", fields::text_after(&text, &["fund manager"])),
        ("benchmark", fields::text_after(&text, &["benchmark"])),
        ("riskometer", fields::riskometer(&text)),
        (
            "lock_in",
            fields::text_after(&text, &["lock-in period", "lock in period", "lock-in"]),
        ),
        ("nav", fields::currency_after(&text, &["current nav", "nav"])),
        ("aum", fields::aum_after(&text, &["fund size", "aum"])),
    ];

    for (field_name, value) in scalar_fields {
        match value {
            Some(value) => facts.push(FundFact {
                id: 0,
                name: field_name.to_string(),
                value,
                source_url: url.to_string(),
                extracted_at: now.clone(),
            }),
            None => misses.push(field_name),
        }
    }

    let holdings: Vec<Holding> = fields::holdings(&document)
        .into_iter()
        .enumerate()
        .map(|(i, (holding_name, allocation_pct))| Holding {
            id: 0,
            position: i as i64 + 1,
            name: holding_name,
            allocation_pct,
            source_url: url.to_string(),
        })
        .collect();

    let peers: Vec<PeerFund> = fields::peers(&document)
        .into_iter()
        .enumerate()
        .map(|(i, (peer_name, return_1y))| PeerFund {
            id: 0,
            position: i as i64 + 1,
            name: peer_name,
            return_1y,
            source_url: url.to_string(),
        })
        .collect();

    let faqs: Vec<FaqEntry> = fields::faqs(&document)
        .into_iter()
        .map(|(question, answer)| FaqEntry {
            id: 0,
            fund_id: 0,
            question,
            answer,
            source_url: url.to_string(),
        })
        .collect();

    if facts.is_empty() && holdings.is_empty() && faqs.is_empty() {
        return Err(ExtractionError::UnsupportedLayout(format!(
            "page for '{}' yielded no facts, holdings or FAQs",
            name
        )));
    }

    debug!(
        url,
        fund = %name,
        facts = facts.len(),
        holdings = holdings.len(),
        peers = peers.len(),
        faqs = faqs.len(),
        misses = ?misses,
        "extraction finished"
    );

    Ok(ExtractionOutcome {
        record: FundRecord {
            id: 0,
            name,
            source_url: url.to_string(),
            scraped_at: now,
            facts,
            holdings,
            peers,
            faqs,
        },
        misses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_PAGE: &str = r#"
        <html><head><title>Parag Parikh Flexi Cap Fund | Example</title></head><body>
        <h1>Parag Parikh Flexi Cap Fund</h1>
        <div><span>Expense Ratio</span><span>0.63%</span></div>
        <div><span>Exit Load</span><span>2% for redemption within 365 days</span></div>
        <div><span>Min. SIP Amount</span><span>₹1,000</span></div>
        <div><span>Fund Size</span><span>₹60,559 Cr</span></div>
        <div><span>1Y Returns</span><span>24.1%</span></div>
        <div><span>3Y Returns</span><span>18.9%</span></div>
        <div><span>Fund Manager</span><span>Rajeev Thakkar</span></div>
        <div><span>Benchmark</span><span>NIFTY 500 TRI</span></div>
        <div><span>Riskometer</span><span>Very High</span></div>
        <table><tr><th>Holding</th><th>Allocation</th></tr>
        <tr><td>HDFC Bank</td><td>8.1%</td></tr>
        <tr><td>Bajaj Holdings</td><td>6.9%</td></tr></table>
        <h3>What is the minimum SIP amount?</h3><p>You can start a SIP with ₹1,000.</p>
        </body></html>"#;

    #[test]
    fn full_page_extracts_facts_sections_and_misses() {
        let outcome = extract_fund("https://x/1", FULL_PAGE).unwrap();
        let record = &outcome.record;

        assert_eq!(record.name, "Parag Parikh Flexi Cap Fund");
        assert_eq!(record.source_url, "https://x/1");
        assert_eq!(record.fact("expense_ratio").unwrap().value, "0.63%");
        assert_eq!(
            record.fact("exit_load").unwrap().value,
            "2% for redemption within 365 days"
        );
        assert_eq!(record.fact("min_sip_amount").unwrap().value, "₹1,000");
        assert_eq!(record.fact("aum").unwrap().value, "₹60,559 Cr");
        assert_eq!(record.fact("return_1y").unwrap().value, "24.1%");
        assert_eq!(record.fact("fund_manager").unwrap().value, "Rajeev Thakkar");
        assert_eq!(record.fact("riskometer").unwrap().value, "Very High");

        assert_eq!(record.holdings.len(), 2);
        assert_eq!(record.holdings[0].name, "HDFC Bank");
        assert_eq!(record.holdings[0].position, 1);
        assert_eq!(record.faqs.len(), 1);
        assert_eq!(record.faqs[0].source_url, "https://x/1");

        assert!(outcome.misses.contains(&"return_5y"));
        assert!(outcome.misses.contains(&"lock_in"));
        assert!(!outcome.misses.contains(&"expense_ratio"));
    }

    #[test]
    fn every_fact_is_stamped_with_the_page_url() {
        let outcome = extract_fund("https://x/attrib", FULL_PAGE).unwrap();
        assert!(outcome
            .record
            .facts
            .iter()
            .all(|f| f.source_url == "https://x/attrib"));
        assert!(!outcome.record.facts.is_empty());
    }

    #[test]
    fn blank_page_is_malformed() {
        assert!(matches!(
            extract_fund("https://x/1", "   "),
            Err(ExtractionError::MalformedPage(_))
        ));
        assert!(matches!(
            extract_fund("https://x/1", "<html><body></body></html>"),
            Err(ExtractionError::MalformedPage(_))
        ));
    }

    #[test]
    fn page_with_name_but_no_content_is_unsupported() {
        let html = "<h1>Some Fund</h1><p>Plain marketing copy only.</p>";
        assert!(matches!(
            extract_fund("https://x/1", html),
            Err(ExtractionError::UnsupportedLayout(_))
        ));
    }

    #[test]
    fn unresolvable_name_is_a_missing_field() {
        let html = "<p>Expense Ratio 0.5%</p>";
        assert!(matches!(
            extract_fund("https://x/", html),
            Err(ExtractionError::MissingField("fund_name"))
        ));
    }

    #[test]
    fn implausible_returns_become_misses() {
        let html = "<h1>Fund</h1><p>Expense Ratio 0.5%</p><p>1Y Returns 2400%</p>";
        let outcome = extract_fund("https://x/1", html).unwrap();
        assert!(outcome.record.fact("return_1y").is_none());
        assert!(outcome.misses.contains(&"return_1y"));
    }
}
