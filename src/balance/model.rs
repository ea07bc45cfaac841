use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical month codes used as the output time axis (Spanish, 3 letters)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Month {
    Ene,
    Feb,
    Mar,
    Abr,
    May,
    Jun,
    Jul,
    Ago,
    Set,
    Oct,
    Nov,
    Dic,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Ene,
        Month::Feb,
        Month::Mar,
        Month::Abr,
        Month::May,
        Month::Jun,
        Month::Jul,
        Month::Ago,
        Month::Set,
        Month::Oct,
        Month::Nov,
        Month::Dic,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Month::Ene => "Ene",
            Month::Feb => "Feb",
            Month::Mar => "Mar",
            Month::Abr => "Abr",
            Month::May => "May",
            Month::Jun => "Jun",
            Month::Jul => "Jul",
            Month::Ago => "Ago",
            Month::Set => "Set",
            Month::Oct => "Oct",
            Month::Nov => "Nov",
            Month::Dic => "Dic",
        }
    }

    /// Zero-based position on the canonical axis
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Month {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Month::ALL
            .iter()
            .copied()
            .find(|m| m.code().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown month code: {s}"))
    }
}

/// Twelve monthly values indexed by [`Month::index`]
pub type MonthlyValues = [f64; 12];

/// Energy flows in MWh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySeries {
    pub regulados: MonthlyValues,
    pub libres: MonthlyValues,
    pub coes: MonthlyValues,
    pub servicios_aux: MonthlyValues,
    pub perdidas: MonthlyValues,
}

/// Sales in currency (millions of soles in the source report)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesSeries {
    pub regulados: MonthlyValues,
    pub libres: MonthlyValues,
    pub coes_spot: MonthlyValues,
    pub otros: MonthlyValues,
}

/// Everything extracted for one year of the balance report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub year: i32,
    pub months: [Month; 12],
    pub observed_months: Vec<Month>,
    pub energy: EnergySeries,
    pub sales: Option<SalesSeries>,
    pub warnings: Vec<String>,
    pub source_id: String,
    pub sheet_name: String,
    pub last_month: Option<Month>,
}

impl ParseResult {
    /// Regulated + free + spot for one month, the figure the dashboards chart as "total"
    pub fn total_for(&self, month: Month) -> f64 {
        let i = month.index();
        self.energy.regulados[i] + self.energy.libres[i] + self.energy.coes[i]
    }
}
