use serde::{Deserialize, Serialize};

use crate::helpers::{aggregate::MonthlySummary, calendar};

/// Column titles shared by both export formats.
pub const EXPORT_COLUMNS: [&str; 8] = [
    "Data",
    "Dia da Semana",
    "Entrada",
    "Saída",
    "Horas",
    "Atraso",
    "Desconto",
    "Notas",
];

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write spreadsheet: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to write CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write export buffer: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build PDF: {0}")]
    Pdf(String),
}

/// A person who signs the printed book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatory {
    pub title: String,
    pub name: String,
}

impl Signatory {
    pub fn new(title: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            name: name.into(),
        }
    }

    pub fn caption(&self) -> String {
        format!("{}: {}", self.title, self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub name: String,
    pub supervisor: Signatory,
    pub employee: Signatory,
}

/// Fixed fields printed above the table and in the signature block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportHeader {
    pub organization: String,
    pub title: String,
    pub supervisor: Signatory,
    pub employee: Signatory,
    pub period_label: String,
    pub total_worked: String,
    pub total_deduction: String,
}

impl ExportHeader {
    pub fn new(organization: &Organization, summary: &MonthlySummary, month: u32, year: i32) -> Self {
        let title = if organization.employee.name.is_empty() {
            "Livro de Ponto".to_string()
        } else {
            format!("Livro de Ponto - {}", organization.employee.name)
        };

        Self {
            organization: organization.name.clone(),
            title,
            supervisor: organization.supervisor.clone(),
            employee: organization.employee.clone(),
            period_label: calendar::period_label(month, year),
            total_worked: summary.total_label(),
            total_deduction: summary.deduction_label(),
        }
    }

    pub fn period_line(&self) -> String {
        format!("Mês: {}", self.period_label)
    }

    pub fn total_line(&self) -> String {
        format!("Total de Horas Trabalhadas: {}", self.total_worked)
    }

    pub fn deduction_line(&self) -> String {
        format!("Total de Descontos: {}", self.total_deduction)
    }
}

pub fn export_file_name(month: u32, year: i32, extension: &str) -> String {
    format!("Ponto_Mensal_{month:02}_{year}.{extension}")
}
