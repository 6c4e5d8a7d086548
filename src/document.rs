//! Built-in sample document served by `GET /generate-pdf`.
//!
//! Two A4 pages: a title with a boxed introduction stamped with the
//! generation date and time, a forced page break, then a second section
//! with a short list. A fixed footer repeats on every page.

use chrono::{Local, NaiveDateTime};

const SAMPLE_STYLES: &str = r#"
    body {
        font-family: 'Inter', sans-serif;
        margin: 0;
        padding: 2cm;
        font-size: 12pt;
        color: #333;
        line-height: 1.6;
    }
    h1 {
        color: #2c3e50;
        text-align: center;
        margin-bottom: 1cm;
        font-size: 24pt;
    }
    h2 {
        font-size: 18pt;
        color: #34495e;
        margin-top: 1.5cm;
        margin-bottom: 0.8cm;
    }
    p {
        margin-bottom: 0.5cm;
    }
    .rounded-box {
        border: 1px solid #ddd;
        border-radius: 8px;
        padding: 15px;
        margin-bottom: 20px;
        background-color: #f9f9f9;
        box-shadow: 0 2px 4px rgba(0, 0, 0, 0.05);
    }
    .page-break {
        page-break-after: always;
    }
    .footer {
        position: fixed;
        bottom: 1cm;
        left: 2cm;
        right: 2cm;
        text-align: center;
        font-size: 10pt;
        color: #7f8c8d;
    }
"#;

/// Sample document stamped with the current local time.
pub fn sample_document_now() -> String {
    sample_document(Local::now().naive_local())
}

/// Sample document stamped with `generated_at`.
pub fn sample_document(generated_at: NaiveDateTime) -> String {
    let date = generated_at.format("%Y-%m-%d");
    let time = generated_at.format("%H:%M:%S");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Generated A4 Document</title>
    <style>{styles}</style>
</head>
<body>
    <h1>Dynamically Generated A4 Document</h1>
    <div class="rounded-box">
        <p>
            Generated on <strong>{date}</strong> at <strong>{time}</strong>
            by a long-lived headless browser shared across requests.
        </p>
        <p>
            Each request borrows a fresh tab from that browser instead of
            starting a new browser, which keeps per-document latency low.
        </p>
        <p>
            The tab is closed as soon as the document has been printed, so
            memory use stays flat no matter how many documents are produced.
        </p>
    </div>

    <div class="page-break"></div>

    <h2>Additional Section</h2>
    <p>
        This section starts on a new page, showing that page breaks are
        controlled from CSS.
    </p>
    <ul>
        <li>First sample list item.</li>
        <li>Second sample list item.</li>
        <li>Third sample list item.</li>
    </ul>

    <div class="footer">Generated {date}</div>
</body>
</html>
"#,
        styles = SAMPLE_STYLES,
        date = date,
        time = time,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 14)
            .and_then(|d| d.and_hms_opt(9, 30, 5))
            .unwrap()
    }

    #[test]
    fn test_sample_document_is_stamped() {
        let html = sample_document(stamp());
        assert!(html.contains("<strong>2026-03-14</strong>"));
        assert!(html.contains("<strong>09:30:05</strong>"));
    }

    #[test]
    fn test_sample_document_structure() {
        let html = sample_document(stamp());
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>"));
        assert!(html.contains("class=\"rounded-box\""));
        assert!(html.contains("class=\"page-break\""));
        assert!(html.contains("<h2>Additional Section</h2>"));
        assert_eq!(html.matches("<li>").count(), 3);
        assert!(html.contains("class=\"footer\""));
    }

    #[test]
    fn test_sample_document_now_is_not_empty() {
        assert!(sample_document_now().contains("</html>"));
    }
}
