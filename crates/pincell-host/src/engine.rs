//! The rendering engine: cell snapshots in, render trees out.
//!
//! Layout of a rendered cell:
//!
//! ```text
//! div.cell [data-kind]
//! ├── div.cell-header
//! ├── div.input-area
//! │   ├── div.collapser
//! │   ├── div.input-prompt      "[3]:"
//! │   └── div.editor            source text
//! ├── div.output-area
//! │   ├── div.collapser
//! │   ├── div.output-prompt     "[3]"
//! │   └── pre.output            one per output line
//! └── div.cell-footer
//! ```
//!
//! The engine knows nothing about mirrors. Every output redraw re-emits the
//! output prompt and collapser, whoever asked for it.

use pincell_types::CellSnapshot;

use crate::error::TreeError;
use crate::render::{NodeId, RenderTree};

/// Class vocabulary emitted by the engine.
pub mod classes {
    pub const CELL: &str = "cell";
    pub const CELL_HEADER: &str = "cell-header";
    pub const CELL_FOOTER: &str = "cell-footer";
    pub const COLLAPSER: &str = "collapser";
    pub const INPUT_AREA: &str = "input-area";
    pub const INPUT_PROMPT: &str = "input-prompt";
    pub const EDITOR: &str = "editor";
    pub const OUTPUT_AREA: &str = "output-area";
    pub const OUTPUT_PROMPT: &str = "output-prompt";
    pub const OUTPUT: &str = "output";
    /// Set on the editor node while it holds input focus.
    pub const FOCUSED: &str = "focused";
    /// Region not displayed.
    pub const HIDDEN: &str = "hidden";
}

/// Stateless cell renderer.
#[derive(Clone, Copy, Debug, Default)]
pub struct Renderer;

impl Renderer {
    /// Render a whole cell.
    pub fn render_cell(&self, cell: &CellSnapshot) -> Result<RenderTree, TreeError> {
        let mut tree = RenderTree::new("div");
        let root = tree.root();
        tree.add_class(root, classes::CELL)?;
        tree.set_attr(root, "data-kind", cell.kind.as_str())?;

        tree.element(root, "div", &[classes::CELL_HEADER])?;

        let input = tree.element(root, "div", &[classes::INPUT_AREA])?;
        tree.element(input, "div", &[classes::COLLAPSER])?;
        let prompt = tree.element(input, "div", &[classes::INPUT_PROMPT])?;
        tree.set_text(prompt, &format!("{}:", cell.execution_count))?;
        let editor = tree.element(input, "div", &[classes::EDITOR])?;
        tree.set_text(editor, &cell.source)?;
        tree.toggle_class(input, classes::HIDDEN, cell.input_hidden)?;

        let output = tree.element(root, "div", &[classes::OUTPUT_AREA])?;
        self.fill_outputs(&mut tree, output, cell)?;
        tree.toggle_class(output, classes::HIDDEN, cell.output_hidden)?;

        tree.element(root, "div", &[classes::CELL_FOOTER])?;

        tree.take_mutations();
        Ok(tree)
    }

    /// Render only the output region. The returned tree's root is the
    /// `output-area` node; its children replace a previous rendering.
    pub fn render_outputs(&self, cell: &CellSnapshot) -> Result<RenderTree, TreeError> {
        let mut tree = RenderTree::new("div");
        let root = tree.root();
        tree.add_class(root, classes::OUTPUT_AREA)?;
        self.fill_outputs(&mut tree, root, cell)?;
        tree.take_mutations();
        Ok(tree)
    }

    fn fill_outputs(
        &self,
        tree: &mut RenderTree,
        area: NodeId,
        cell: &CellSnapshot,
    ) -> Result<(), TreeError> {
        if cell.outputs.is_empty() {
            return Ok(());
        }
        tree.element(area, "div", &[classes::COLLAPSER])?;
        let prompt = tree.element(area, "div", &[classes::OUTPUT_PROMPT])?;
        tree.set_text(prompt, &cell.execution_count.to_string())?;
        for line in &cell.outputs {
            let out = tree.element(area, "pre", &[classes::OUTPUT])?;
            tree.set_text(out, line)?;
        }
        Ok(())
    }
}
