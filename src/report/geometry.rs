use thiserror::Error;

/// Lengths are millimetres; y grows downward from the top edge of the page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub header_band_height: f32,
    pub footer_band_height: f32,
    pub table_header_height: f32,
    pub min_row_height: f32,
    pub line_height: f32,
    pub section_gap: f32,
    pub cell_padding: f32,
    pub column_ratios: ColumnRatios,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnRatios {
    pub query: f32,
    pub response: f32,
    pub reference: f32,
}

impl ColumnRatios {
    pub fn as_array(&self) -> [f32; 3] {
        [self.query, self.response, self.reference]
    }
}

impl Default for ColumnRatios {
    // 60 : 100 : 100
    fn default() -> Self {
        Self { query: 60.0 / 260.0, response: 100.0 / 260.0, reference: 100.0 / 260.0 }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("{0} must be a positive finite length")] NotPositive(&'static str),
    #[error("column ratios sum to {0}, expected 1")] Ratios(f32),
    #[error("no room for table rows: content area ends at {bottom}mm but rows start at {top}mm")]
    NoRoom { top: f32, bottom: f32 },
}

impl Default for PageGeometry {
    /// A4 landscape.
    fn default() -> Self {
        Self {
            width: 297.0,
            height: 210.0,
            margin: 15.0,
            header_band_height: 20.0,
            footer_band_height: 10.0,
            table_header_height: 10.0,
            min_row_height: 20.0,
            line_height: 4.0,
            section_gap: 10.0,
            cell_padding: 5.0,
            column_ratios: ColumnRatios::default(),
        }
    }
}

impl PageGeometry {
    pub fn content_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }

    /// Lowest y a row may reach before it has to move to the next page.
    pub fn content_bottom(&self) -> f32 {
        self.height - self.margin - self.footer_band_height
    }

    /// First y below the header band where page content starts.
    pub fn content_top(&self) -> f32 {
        self.header_band_height + self.section_gap
    }

    /// Left x and width of the query, response and reference columns.
    pub fn columns(&self) -> [(f32, f32); 3] {
        let content = self.content_width();
        let mut x = self.margin;
        self.column_ratios.as_array().map(|ratio| {
            let width = content * ratio;
            let column = (x, width);
            x += width;
            column
        })
    }

    pub fn validate(&self) -> Result<(), GeometryError> {
        let lengths = [
            ("width", self.width),
            ("height", self.height),
            ("header_band_height", self.header_band_height),
            ("footer_band_height", self.footer_band_height),
            ("table_header_height", self.table_header_height),
            ("min_row_height", self.min_row_height),
            ("line_height", self.line_height),
            ("content width", self.content_width()),
        ];
        for (name, value) in lengths {
            if !value.is_finite() || value <= 0.0 {
                return Err(GeometryError::NotPositive(name));
            }
        }
        for (name, value) in [("margin", self.margin), ("section_gap", self.section_gap), ("cell_padding", self.cell_padding)] {
            if !value.is_finite() || value < 0.0 {
                return Err(GeometryError::NotPositive(name));
            }
        }
        let sum: f32 = self.column_ratios.as_array().iter().sum();
        if self.column_ratios.as_array().iter().any(|r| *r <= 0.0) || (sum - 1.0).abs() > 1e-3 {
            return Err(GeometryError::Ratios(sum));
        }
        let top = self.content_top() + self.table_header_height;
        let bottom = self.content_bottom();
        if top >= bottom {
            return Err(GeometryError::NoRoom { top, bottom });
        }
        Ok(())
    }
}
