use std::fmt::Write;

use crate::IpoRecord;

/// Portal where investors apply for open issues.
pub const APPLICATION_PORTAL_URL: &str = "https://meroshare.cdsc.com.np";

const MISSING_FIELD: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

/// Builds the notification for one listing. Output depends only on the record.
pub fn compose_notification(record: &IpoRecord) -> EmailMessage {
    let subject = format!("IPO Open: {}", record.company_name());

    let mut body = String::new();
    body.push_str("Hello,\n\n");
    body.push_str("The following IPO is now open for application:\n\n");
    let _ = writeln!(body, "Company Name: {}", record.company_name());
    let _ = writeln!(
        body,
        "Units Available: {}",
        record.units().unwrap_or(MISSING_FIELD)
    );
    let _ = writeln!(
        body,
        "Price per Unit: {}",
        record.price_per_unit().unwrap_or(MISSING_FIELD)
    );
    let _ = writeln!(body, "Open Date: {}", record.open_date().format("%Y-%m-%d"));
    let _ = writeln!(body, "Close Date: {}", record.close_date().format("%Y-%m-%d"));
    if let Some(status) = record.status() {
        let _ = writeln!(body, "Status: {status}");
    }
    let _ = write!(
        body,
        "\nApply through the official portal: {APPLICATION_PORTAL_URL}\n\n\
         --\nThis is an automated notification from IPO Alert.\n"
    );

    EmailMessage { subject, body }
}
