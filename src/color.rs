//! Device color model used for redaction fills and highlight overlays

use lopdf::{content::Operation, Object};
use serde::{Deserialize, Serialize};

/// A device-space fill color
///
/// Covers the three device color spaces addressable with the plain fill
/// operators (`g`, `rg`, `k`); resource-backed color spaces are owned by
/// the document model and out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Color {
    Gray(f64),
    Rgb(f64, f64, f64),
    Cmyk(f64, f64, f64, f64),
}

impl Color {
    pub fn black() -> Self {
        Color::Gray(0.0)
    }

    pub fn green() -> Self {
        Color::Rgb(0.0, 1.0, 0.0)
    }

    /// The non-stroking color operator selecting this color
    pub fn fill_operator(&self) -> &'static str {
        match self {
            Color::Gray(_) => "g",
            Color::Rgb(..) => "rg",
            Color::Cmyk(..) => "k",
        }
    }

    /// Operand list for [`fill_operator`](Self::fill_operator)
    pub fn fill_operands(&self) -> Vec<Object> {
        let components: Vec<f64> = match *self {
            Color::Gray(g) => vec![g],
            Color::Rgb(r, g, b) => vec![r, g, b],
            Color::Cmyk(c, m, y, k) => vec![c, m, y, k],
        };
        components
            .into_iter()
            .map(Object::Real)
            .collect()
    }

    /// The complete fill-color operation
    pub fn to_operation(&self) -> Operation {
        Operation::new(self.fill_operator(), self.fill_operands())
    }
}
