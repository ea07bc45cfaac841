//! Target metrics and the row labels that identify them.

/// Energy metrics, in series order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyMetric {
    Regulados,
    Libres,
    Coes,
    ServiciosAux,
    Perdidas,
}

impl EnergyMetric {
    pub const ALL: [EnergyMetric; 5] = [
        EnergyMetric::Regulados,
        EnergyMetric::Libres,
        EnergyMetric::Coes,
        EnergyMetric::ServiciosAux,
        EnergyMetric::Perdidas,
    ];

    /// Metrics matched preferentially inside the sale section
    pub const SALE_SCOPED: [EnergyMetric; 3] = [
        EnergyMetric::Regulados,
        EnergyMetric::Libres,
        EnergyMetric::Coes,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn key(&self) -> &'static str {
        match self {
            EnergyMetric::Regulados => "regulados",
            EnergyMetric::Libres => "libres",
            EnergyMetric::Coes => "coes",
            EnergyMetric::ServiciosAux => "servicios_aux",
            EnergyMetric::Perdidas => "perdidas",
        }
    }

    /// Row name as printed in the report, used in missing-row warnings
    pub fn report_label(&self) -> &'static str {
        match self {
            EnergyMetric::Regulados => "A emp. Distribuidoras",
            EnergyMetric::Libres => "A clientes Libres",
            EnergyMetric::Coes => "COES",
            EnergyMetric::ServiciosAux => "Servicios auxiliares",
            EnergyMetric::Perdidas => "Pérdidas",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            EnergyMetric::Regulados => REGULADOS_ENERGY,
            EnergyMetric::Libres => LIBRES_ENERGY,
            EnergyMetric::Coes => COES_ENERGY,
            EnergyMetric::ServiciosAux => SERVICIOS_AUX_PREFERRED,
            EnergyMetric::Perdidas => PERDIDAS_ENERGY,
        }
    }
}

/// Monetary metrics, in series order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SalesMetric {
    Regulados,
    Libres,
    CoesSpot,
    Otros,
}

impl SalesMetric {
    pub const ALL: [SalesMetric; 4] = [
        SalesMetric::Regulados,
        SalesMetric::Libres,
        SalesMetric::CoesSpot,
        SalesMetric::Otros,
    ];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn key(&self) -> &'static str {
        match self {
            SalesMetric::Regulados => "regulados",
            SalesMetric::Libres => "libres",
            SalesMetric::CoesSpot => "coes_spot",
            SalesMetric::Otros => "otros",
        }
    }

    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            SalesMetric::Regulados => REGULADOS_SALES,
            SalesMetric::Libres => LIBRES_SALES,
            SalesMetric::CoesSpot => COES_SALES,
            SalesMetric::Otros => OTROS_SALES,
        }
    }
}

// All aliases are in normalized form (uppercase, no accents)

pub const REGULADOS_ENERGY: &[&str] = &[
    "A EMP. DISTRIBUIDORAS",
    "A EMP DISTRIBUIDORAS",
    "MERCADO REGULADO",
    "REGULADOS",
];
pub const LIBRES_ENERGY: &[&str] = &["A CLIENTES LIBRES", "MERCADO LIBRE", "LIBRES"];
pub const COES_ENERGY: &[&str] = &["COES", "SPOT", "COES SPOT", "COES-SPOT", "MERCADO SPOT"];
pub const SERVICIOS_AUX_PREFERRED: &[&str] = &["SERVICIOS AUXILIARES", "SSAA"];
pub const SERVICIOS_AUX_FALLBACK: &[&str] = &[
    "CONSUMO PROPIO DE CENTRALES",
    "CONSUMO PROPIO CENTRALES",
    "CONSUMO PROPIO",
];
pub const PERDIDAS_ENERGY: &[&str] = &["PERDIDAS SISTEMAS TRANSMISION", "PERDIDAS"];

pub const REGULADOS_SALES: &[&str] = &["REGULADOS", "MERCADO REGULADO", "A EMP. DISTRIBUIDORAS"];
pub const LIBRES_SALES: &[&str] = &["LIBRES", "MERCADO LIBRE", "A CLIENTES LIBRES"];
pub const COES_SALES: &[&str] = &["COES", "SPOT", "COES-SPOT", "COES SPOT"];
pub const OTROS_SALES: &[&str] = &["OTROS"];

/// Banner prefixes opening the sale / purchase sub-tables
pub const SALE_BANNERS: &[&str] = &["VENTA DE ENERGIA", "VENTA ENERGIA", "VENTA DE ENER"];
pub const PURCHASE_BANNERS: &[&str] = &["COMPRA DE ENERGIA", "COMPRA ENER", "COMPRA DE ENER"];
