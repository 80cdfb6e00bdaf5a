//! Installed-font detection by rendered text box comparison.
//!
//! A candidate font counts as installed when rendering the sample string
//! with `"<candidate>,<fallback>"` yields a box different from `fallback`
//! alone, for at least one fallback in the list.

use std::collections::HashMap;

use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

use crate::dom;
use crate::error::{Result, VisitorError};

const SAMPLE_TEXT: &str = "mmwwwwWWlli@0OO&1";
const SAMPLE_SIZE: &str = "72px";

/// Candidate fonts, also used as the fallback list. Order is the output order.
pub const CANDIDATE_FONTS: &[&str] = &[
    // Android "Roboto" family
    "sans-serif-thin",
    "ARNO PRO",
    "Agency FB",
    "Arabic Typesetting",
    "Arial Unicode MS",
    "AvantGarde Bk BT",
    "BankGothic Md BT",
    "Batang",
    "Bitstream Vera Sans Mono",
    "Calibri",
    "Century",
    "Century Gothic",
    "Clarendon",
    "EUROSTILE",
    "Franklin Gothic",
    "Futura Bk BT",
    "Futura Md BT",
    "GOTHAM",
    "Gill Sans",
    "HELV",
    "Haettenschweiler",
    "Helvetica Neue",
    "Humanst521 BT",
    "Leelawadee",
    "Letter Gothic",
    "Levenim MT",
    "Lucida Bright",
    "Lucida Sans",
    "Menlo",
    "MS Mincho",
    "MS Outlook",
    "MS Reference Specialty",
    "MS UI Gothic",
    "MT Extra",
    "MYRIAD PRO",
    "Marlett",
    "Meiryo UI",
    "Microsoft Uighur",
    "Minion Pro",
    "Monotype Corsiva",
    "PMingLiU",
    "Pristina",
    "SCRIPTINA",
    "Segoe UI Light",
    "Serifa",
    "SimHei",
    "Small Fonts",
    "Staccato222 BT",
    "TRAJAN PRO",
    "Univers CE 55 Medium",
    "Vrinda",
    "ZWAdobeF",
];

/// Rendered box of the sample text as `(width, height)`.
pub type TextBox = (f64, f64);

/// Renders the sample text in a CSS `font-family` list and reports its box.
pub trait TextMeasurer {
    fn measure(&self, font_family: &str) -> Result<TextBox>;
}

/// Filter `candidates` down to the ones the measurer can tell apart from
/// every-fallback-alone rendering.
pub fn detect_fonts<M: TextMeasurer + ?Sized>(
    measurer: &M,
    candidates: &[&str],
) -> Result<Vec<String>> {
    let mut baseline: HashMap<&str, TextBox> = HashMap::with_capacity(candidates.len());
    for &fallback in candidates {
        baseline.insert(fallback, measurer.measure(fallback)?);
    }

    let mut detected = Vec::new();
    for &font in candidates {
        let mut found = false;
        for &fallback in candidates {
            let measured = measurer.measure(&format!("{},{}", font, fallback))?;
            // no short-circuit: every pairing is rendered
            found |= measured != baseline[fallback];
        }
        if found {
            detected.push(font.to_string());
        }
    }
    Ok(detected)
}

/// Measures a 72px `<span>` inside a temporary `<div>` on `document.body`.
///
/// The container is detached on drop.
pub struct DomTextMeasurer {
    container: HtmlElement,
    span: HtmlElement,
    body: HtmlElement,
}

impl DomTextMeasurer {
    pub fn new() -> Result<Self> {
        let document = dom::document()?;
        let body = dom::body(&document)?;

        let container: HtmlElement = document
            .create_element("div")
            .map_err(|e| VisitorError::js("create div", &e))?
            .dyn_into()
            .map_err(|_| VisitorError::extractor("fonts", "div is not an HtmlElement"))?;
        let span: HtmlElement = document
            .create_element("span")
            .map_err(|e| VisitorError::js("create span", &e))?
            .dyn_into()
            .map_err(|_| VisitorError::extractor("fonts", "span is not an HtmlElement"))?;

        span.style()
            .set_property("font-size", SAMPLE_SIZE)
            .map_err(|e| VisitorError::js("set font-size", &e))?;
        span.set_inner_html(SAMPLE_TEXT);

        body.append_child(&container)
            .map_err(|e| VisitorError::js("attach measuring container", &e))?;

        Ok(Self {
            container,
            span,
            body,
        })
    }
}

impl TextMeasurer for DomTextMeasurer {
    fn measure(&self, font_family: &str) -> Result<TextBox> {
        self.span
            .style()
            .set_property("font-family", font_family)
            .map_err(|e| VisitorError::js("set font-family", &e))?;
        self.container
            .append_child(&self.span)
            .map_err(|e| VisitorError::js("attach measuring span", &e))?;
        let measured = (
            self.span.offset_width() as f64,
            self.span.offset_height() as f64,
        );
        self.container
            .remove_child(&self.span)
            .map_err(|e| VisitorError::js("detach measuring span", &e))?;
        Ok(measured)
    }
}

impl Drop for DomTextMeasurer {
    fn drop(&mut self) {
        if let Err(e) = self.body.remove_child(&self.container) {
            log::warn!("Font measuring container was already detached: {:?}", e);
        }
    }
}

/// Installed-font list from the live document.
pub fn detect_installed_fonts() -> Result<Vec<String>> {
    let measurer = DomTextMeasurer::new()?;
    detect_fonts(&measurer, CANDIDATE_FONTS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Pretends only `installed` fonts exist: any family list whose first
    /// entry is installed renders 10px wider than its fallback.
    struct FakeMeasurer {
        installed: Vec<&'static str>,
        calls: Cell<usize>,
    }

    impl TextMeasurer for FakeMeasurer {
        fn measure(&self, font_family: &str) -> Result<TextBox> {
            self.calls.set(self.calls.get() + 1);
            let mut parts = font_family.split(',');
            let first = parts.next().unwrap_or_default();
            let fallback = parts.next();
            let base = 100.0 + first.len() as f64;
            match fallback {
                Some(_) if self.installed.iter().any(|f| *f == first) => Ok((base + 10.0, 80.0)),
                Some(fb) => Ok((100.0 + fb.len() as f64, 80.0)),
                None => Ok((base, 80.0)),
            }
        }
    }

    struct BrokenMeasurer;

    impl TextMeasurer for BrokenMeasurer {
        fn measure(&self, _font_family: &str) -> Result<TextBox> {
            Err(VisitorError::extractor("fonts", "layout unavailable"))
        }
    }

    #[test]
    fn test_detects_only_installed_fonts_in_candidate_order() {
        let measurer = FakeMeasurer {
            installed: vec!["Menlo", "Calibri"],
            calls: Cell::new(0),
        };
        let found = detect_fonts(&measurer, CANDIDATE_FONTS).unwrap();
        assert_eq!(found, vec!["Calibri".to_string(), "Menlo".to_string()]);
    }

    #[test]
    fn test_nothing_installed() {
        let measurer = FakeMeasurer {
            installed: vec![],
            calls: Cell::new(0),
        };
        assert!(detect_fonts(&measurer, &["A", "B", "C"]).unwrap().is_empty());
    }

    #[test]
    fn test_measures_every_pairing() {
        let measurer = FakeMeasurer {
            installed: vec!["A"],
            calls: Cell::new(0),
        };
        detect_fonts(&measurer, &["A", "B", "C"]).unwrap();
        // 3 baselines + 3x3 pairings
        assert_eq!(measurer.calls.get(), 12);
    }

    #[test]
    fn test_measure_failure_propagates() {
        assert!(detect_fonts(&BrokenMeasurer, &["A"]).is_err());
    }
}
