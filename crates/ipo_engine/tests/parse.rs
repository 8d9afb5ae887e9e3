use chrono::NaiveDate;
use ipo_core::RowRejection;
use ipo_engine::{ListingParseError, ListingParser, ParserSettings, TableListingParser};
use pretty_assertions::assert_eq;

fn page(rows: &str) -> String {
    format!(
        r#"<html><body>
        <div id="news">Market closes higher</div>
        <div id="eipo">
          <table>
            <thead>
              <tr><th>S.N.</th><th>Status</th><th>Company</th><th>Units</th>
                  <th>Price</th><th>Opening Date</th><th>Closing Date</th></tr>
            </thead>
            <tbody>{rows}</tbody>
          </table>
        </div>
        </body></html>"#
    )
}

fn row(status: &str, company: &str, units: &str, price: &str, open: &str, close: &str) -> String {
    format!(
        "<tr><td>1</td><td>{status}</td><td>{company}</td><td>{units}</td>\
         <td>{price}</td><td>{open}</td><td>{close}</td></tr>"
    )
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn listings_come_back_in_document_order() {
    let rows = [
        row("Open", "Alpha Hydropower Ltd.", "1,000,000", "100", "2024-01-10", "2024-01-14"),
        row("Open", "Beta Microfinance", "250,000", "100", "2024-01-11", "2024-01-15"),
        row("Coming Soon", "Gamma Insurance", "", "", "2024-02-01", "2024-02-05"),
    ]
    .concat();

    let listings = TableListingParser::default().parse(&page(&rows)).unwrap();

    let names: Vec<&str> = listings.records.iter().map(|r| r.company_name()).collect();
    assert_eq!(
        names,
        vec!["Alpha Hydropower Ltd.", "Beta Microfinance", "Gamma Insurance"]
    );
    assert!(listings.rejected.is_empty());

    let alpha = &listings.records[0];
    assert_eq!(alpha.units(), Some("1,000,000"));
    assert_eq!(alpha.price_per_unit(), Some("100"));
    assert_eq!(alpha.open_date(), date(2024, 1, 10));
    assert_eq!(alpha.close_date(), date(2024, 1, 14));
    assert!(alpha.is_open());

    let gamma = &listings.records[2];
    assert_eq!(gamma.units(), None);
    assert!(!gamma.is_open());
}

#[test]
fn malformed_row_is_dropped_and_reported() {
    let rows = [
        row("Open", "Alpha Hydropower", "100", "100", "2024-01-10", "2024-01-14"),
        row("Open", "Broken Capital", "100", "100", "2024-01-11", ""),
        row("Open", "Gamma Insurance", "100", "100", "tomorrow", "2024-01-20"),
        row("Open", "Delta Bank", "100", "100", "2024-01-12", "2024-01-16"),
    ]
    .concat();

    let listings = TableListingParser::default().parse(&page(&rows)).unwrap();

    let names: Vec<&str> = listings.records.iter().map(|r| r.company_name()).collect();
    assert_eq!(names, vec!["Alpha Hydropower", "Delta Bank"]);
    assert_eq!(
        listings.rejected,
        vec![
            RowRejection {
                row: 2,
                reason: "missing close date".to_string(),
            },
            RowRejection {
                row: 3,
                reason: "invalid open date \"tomorrow\"".to_string(),
            },
        ]
    );
}

#[test]
fn close_before_open_is_rejected() {
    let rows = row("Open", "Backwards Ltd", "", "", "2024-01-20", "2024-01-10");
    let listings = TableListingParser::default().parse(&page(&rows)).unwrap();
    assert!(listings.records.is_empty());
    assert_eq!(listings.rejected.len(), 1);
    assert_eq!(listings.rejected[0].row, 1);
}

#[test]
fn banner_and_spacer_rows_are_ignored() {
    let rows = format!(
        "<tr><td colspan=\"7\">Upcoming issues</td></tr><tr><td></td><td></td></tr>{}",
        row("Open", "Alpha Hydropower", "", "", "2024-01-10", "2024-01-14")
    );
    let listings = TableListingParser::default().parse(&page(&rows)).unwrap();
    assert_eq!(listings.records.len(), 1);
    assert!(listings.rejected.is_empty());
}

#[test]
fn same_company_with_different_windows_are_distinct() {
    let rows = [
        row("Open", "Alpha Hydropower", "", "", "2024-01-10", "2024-01-14"),
        row("Open", "alpha  hydropower", "", "", "2024-01-10", "2024-01-14"),
        row("Open", "Alpha Hydropower", "", "", "2024-06-01", "2024-06-05"),
    ]
    .concat();

    let listings = TableListingParser::default().parse(&page(&rows)).unwrap();

    let ids: Vec<&str> = listings.records.iter().map(|r| r.id().as_str()).collect();
    assert_eq!(
        ids,
        vec!["alpha hydropower@2024-01-10", "alpha hydropower@2024-06-01"]
    );
}

#[test]
fn page_without_listing_table_is_an_error() {
    let markup = "<html><body><table><tr><th>Symbol</th><th>LTP</th></tr>\
                  <tr><td>NABIL</td><td>500</td></tr></table></body></html>";
    let err = TableListingParser::default().parse(markup).unwrap_err();
    assert_eq!(err, ListingParseError::TableNotFound);
}

#[test]
fn falls_back_to_table_with_company_header() {
    let markup = r#"<html><body>
        <table><tr><th>Symbol</th><th>LTP</th></tr><tr><td>NABIL</td><td>500</td></tr></table>
        <table>
          <tr><th>Issuer</th><th>Issue Open Date</th><th>Issue Close Date</th></tr>
          <tr><td>River Falls Power</td><td>15 Jan 2024</td><td>Jan 19, 2024</td></tr>
        </table></body></html>"#;

    let listings = TableListingParser::default().parse(markup).unwrap();
    assert_eq!(listings.records.len(), 1);
    let record = &listings.records[0];
    assert_eq!(record.company_name(), "River Falls Power");
    assert_eq!(record.open_date(), date(2024, 1, 15));
    assert_eq!(record.close_date(), date(2024, 1, 19));
    assert_eq!(record.status(), None);
    assert!(record.is_open());
}

#[test]
fn headerless_table_uses_fixed_positions() {
    let markup = format!(
        "<div id=\"eipo\"><table>{}</table></div>",
        row("Open", "Alpha Hydropower", "5000", "100", "2024/01/10", "2024/01/14")
    );
    let listings = TableListingParser::default().parse(&markup).unwrap();
    assert_eq!(listings.records.len(), 1);
    assert_eq!(listings.records[0].company_name(), "Alpha Hydropower");
    assert_eq!(listings.records[0].units(), Some("5000"));
}

#[test]
fn custom_section_selector() {
    let markup = format!(
        "<section class=\"issues\"><table>{}</table></section>",
        row("Open", "Alpha Hydropower", "", "", "2024-01-10", "2024-01-14")
    );
    let parser = TableListingParser::new(ParserSettings {
        section_selector: "section.issues".to_string(),
    });
    assert_eq!(parser.parse(&markup).unwrap().records.len(), 1);
}

#[test]
fn invalid_selector_is_reported() {
    let parser = TableListingParser::new(ParserSettings {
        section_selector: "[[".to_string(),
    });
    assert!(matches!(
        parser.parse("<html></html>"),
        Err(ListingParseError::InvalidSelector { .. })
    ));
}
