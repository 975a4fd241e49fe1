use std::str::FromStr;

use leadscout_common::Lead;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// One canonical phone number per line.
    Phones,
    Csv,
}

impl ExportFormat {
    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Phones => "leads_phones.txt",
            ExportFormat::Csv => "leads.csv",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Phones => "text/plain; charset=utf-8",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "phones" | "txt" => Ok(ExportFormat::Phones),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(format!("unknown export format '{other}', expected 'phones' or 'csv'")),
        }
    }
}

const CSV_HEADER: &str = "name,company,email,phone,country,status,niche";

pub fn render(format: ExportFormat, leads: &[Lead]) -> String {
    match format {
        ExportFormat::Phones => phones(leads),
        ExportFormat::Csv => csv(leads),
    }
}

fn phones(leads: &[Lead]) -> String {
    leads
        .iter()
        .map(|l| l.phone_number.as_str())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn csv(leads: &[Lead]) -> String {
    let mut out = String::from(CSV_HEADER);
    for lead in leads {
        let row = [
            lead.name.as_str(),
            lead.company.as_str(),
            lead.email.as_deref().unwrap_or(""),
            lead.phone_number.as_str(),
            lead.country.as_str(),
            lead.status.as_str(),
            lead.niche.as_str(),
        ]
        .map(quote)
        .join(",");
        out.push('\n');
        out.push_str(&row);
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
