//! Assembly boundary: the slide-building API the finalized element list
//! is handed to, one call per element.
//!
//! The traits are the produced-to contract; deck serialization itself
//! lives entirely on the caller's side. Implementations that do not
//! support a feature can return an `Assembly` error, which aborts the
//! conversion.

use crate::error::{Error, Result};
use crate::model::{
    Background, ElementKind, ImageElement, LineElement, ListElement, Position, ShapeElement,
    SlideDocument, TableElement, TextElement,
};
use crate::LayoutSize;

/// One slide being built. Geometry is absolute, in inches.
pub trait SlideBuilder {
    fn set_background(&mut self, background: &Background) -> Result<()>;

    /// A single plain run.
    fn add_text(&mut self, position: &Position, text: &TextElement) -> Result<()>;

    /// Multiple runs or styled runs.
    fn add_text_runs(&mut self, position: &Position, text: &TextElement) -> Result<()>;

    fn add_shape(
        &mut self,
        position: &Position,
        shape: &ShapeElement,
        text: Option<&TextElement>,
    ) -> Result<()>;

    fn add_line(&mut self, position: &Position, line: &LineElement) -> Result<()>;

    fn add_image(&mut self, position: &Position, image: &ImageElement) -> Result<()>;

    fn add_table(&mut self, position: &Position, table: &TableElement) -> Result<()>;

    fn add_list(&mut self, position: &Position, list: &ListElement) -> Result<()>;
}

/// The target deck a conversion appends one slide to.
pub trait DeckBuilder {
    type Slide: SlideBuilder;

    fn add_slide(&mut self, layout: LayoutSize) -> Result<Self::Slide>;
}

/// Drive the slide-building API over a finalized document. The document
/// must be fully resolved: no element still pending rasterization.
pub fn assemble<S: SlideBuilder>(doc: &SlideDocument, slide: &mut S) -> Result<()> {
    if !doc.is_resolved() {
        return Err(Error::Assembly(
            "document still contains unresolved raster targets".to_string(),
        ));
    }
    if let Some(background) = &doc.background {
        slide.set_background(background)?;
    }
    for element in &doc.elements {
        let position = &element.position;
        match &element.kind {
            ElementKind::Text(text) => {
                let single_plain = text.runs.len() == 1 && text.runs[0].style.is_plain();
                if single_plain {
                    slide.add_text(position, text)?;
                } else {
                    slide.add_text_runs(position, text)?;
                }
            }
            ElementKind::Shape(shape) => slide.add_shape(position, shape, None)?,
            ElementKind::Image(image) => slide.add_image(position, image)?,
            ElementKind::Line(line) => slide.add_line(position, line)?,
            ElementKind::Table(table) => slide.add_table(position, table)?,
            ElementKind::List(list) => slide.add_list(position, list)?,
            ElementKind::Raster(_) => {
                // unreachable by the is_resolved gate
                return Err(Error::Assembly(
                    "raster target reached the assembler".to_string(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, InlineRun, RunStyle, TextStyle};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
    }

    impl SlideBuilder for Recorder {
        fn set_background(&mut self, _b: &Background) -> Result<()> {
            self.calls.push("background");
            Ok(())
        }
        fn add_text(&mut self, _p: &Position, _t: &TextElement) -> Result<()> {
            self.calls.push("text");
            Ok(())
        }
        fn add_text_runs(&mut self, _p: &Position, _t: &TextElement) -> Result<()> {
            self.calls.push("text-runs");
            Ok(())
        }
        fn add_shape(
            &mut self,
            _p: &Position,
            _s: &ShapeElement,
            _t: Option<&TextElement>,
        ) -> Result<()> {
            self.calls.push("shape");
            Ok(())
        }
        fn add_line(&mut self, _p: &Position, _l: &LineElement) -> Result<()> {
            self.calls.push("line");
            Ok(())
        }
        fn add_image(&mut self, _p: &Position, _i: &ImageElement) -> Result<()> {
            self.calls.push("image");
            Ok(())
        }
        fn add_table(&mut self, _p: &Position, _t: &TableElement) -> Result<()> {
            self.calls.push("table");
            Ok(())
        }
        fn add_list(&mut self, _p: &Position, _l: &ListElement) -> Result<()> {
            self.calls.push("list");
            Ok(())
        }
    }

    fn text(runs: Vec<InlineRun>) -> Element {
        Element {
            position: Position::default(),
            kind: ElementKind::Text(TextElement {
                runs,
                style: TextStyle::default(),
            }),
        }
    }

    #[test]
    fn plain_and_styled_text_take_different_calls() {
        let mut doc = SlideDocument::default();
        doc.elements.push(text(vec![InlineRun::plain("plain")]));
        doc.elements.push(text(vec![
            InlineRun::plain("a"),
            InlineRun {
                text: "b".to_string(),
                style: RunStyle {
                    bold: true,
                    ..RunStyle::default()
                },
                break_after: false,
            },
        ]));
        let mut rec = Recorder::default();
        assemble(&doc, &mut rec).unwrap();
        assert_eq!(rec.calls, vec!["text", "text-runs"]);
    }

    #[test]
    fn background_is_set_before_elements() {
        let mut doc = SlideDocument::default();
        doc.background = Some(Background::Color("FFFFFF".to_string()));
        doc.elements.push(text(vec![InlineRun::plain("x")]));
        let mut rec = Recorder::default();
        assemble(&doc, &mut rec).unwrap();
        assert_eq!(rec.calls, vec!["background", "text"]);
    }

    #[test]
    fn unresolved_document_is_rejected() {
        let mut doc = SlideDocument::default();
        doc.elements.push(Element {
            position: Position::default(),
            kind: ElementKind::Raster(crate::model::RasterTarget {
                tag: "div".to_string(),
                attrs: Vec::new(),
                css: Vec::new(),
                inner_html: None,
                shadow: None,
            }),
        });
        let mut rec = Recorder::default();
        assert!(assemble(&doc, &mut rec).is_err());
    }
}
