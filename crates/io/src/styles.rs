// rust_xlsxwriter formats for enriched and ledger workbooks

use parcelgrid_recon::annotate::NumberFormat;
use parcelgrid_recon::ledger::{LabelStyle, CURRENCY_USD_SIMPLE, TITLE_COLOR};
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder};

pub const HIGHLIGHT: Color = Color::RGB(0xFFFF00);

/// Bold, centered header; yellow when `fill`.
pub fn header(fill: bool) -> Format {
    let format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    if fill {
        format.set_background_color(HIGHLIGHT)
    } else {
        format
    }
}

pub fn highlighted(base: Option<&Format>) -> Format {
    base.cloned()
        .unwrap_or_else(Format::new)
        .set_background_color(HIGHLIGHT)
}

pub fn number_format(format: &NumberFormat) -> Format {
    match format {
        NumberFormat::Currency(pattern) => Format::new().set_num_format(pattern),
        NumberFormat::General => Format::new().set_num_format("General"),
    }
}

pub fn ledger_header(highlight: bool) -> Option<Format> {
    highlight.then(|| Format::new().set_bold().set_background_color(HIGHLIGHT))
}

pub fn label(style: LabelStyle) -> Format {
    let format = Format::new().set_bold().set_border(FormatBorder::Thin);
    match style {
        LabelStyle::Title => format.set_font_color(Color::RGB(TITLE_COLOR)),
        LabelStyle::Header => format.set_align(FormatAlign::Center),
    }
}

pub fn summary_value(currency: bool) -> Format {
    let format = Format::new().set_border(FormatBorder::Thin);
    if currency {
        format.set_num_format(CURRENCY_USD_SIMPLE)
    } else {
        format
    }
}
