//! Passive watchers that correct drift from the rendering engine's redraws.
//!
//! The engine is not mirror-aware: it toggles focus on the editor node and
//! re-emits prompt chrome into the output region on every redraw. These
//! reactions bring the mirror back in line each time.

use pincell_host::{classes, MutationRecord, NodeId, RenderTree, TreeError};

use crate::observer::{ObserveOptions, Observer, Reaction};

/// Mirrors the editor's focus state onto the execution-count display.
pub struct FocusWatcher {
    editor: NodeId,
    display: NodeId,
}

impl FocusWatcher {
    pub fn observer(editor: NodeId, display: NodeId) -> Observer {
        Observer::new(
            "focus",
            editor,
            ObserveOptions::attributes(&["class"]),
            Self { editor, display },
        )
    }
}

impl Reaction for FocusWatcher {
    fn react(&mut self, tree: &mut RenderTree, _: &[MutationRecord]) -> Result<(), TreeError> {
        let focused = tree.has_class(self.editor, classes::FOCUSED)?;
        tree.toggle_class(self.display, classes::FOCUSED, focused)
    }
}

/// Strips prompt markers and collapse handles re-inserted into the output
/// region.
pub struct OutputWatcher {
    output: NodeId,
}

impl OutputWatcher {
    /// Chrome the mirror's compact output layout has no room for.
    pub const STRIPPED: [&'static str; 2] = [classes::OUTPUT_PROMPT, classes::COLLAPSER];

    pub fn observer(output: NodeId) -> Observer {
        Observer::new(
            "output",
            output,
            ObserveOptions::child_list_subtree(),
            Self { output },
        )
    }
}

impl Reaction for OutputWatcher {
    fn react(&mut self, tree: &mut RenderTree, _: &[MutationRecord]) -> Result<(), TreeError> {
        for class in Self::STRIPPED {
            for node in tree.find_all_by_class(self.output, class) {
                if node != self.output && tree.is_alive(node) {
                    tree.remove(node)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::ObserverSet;

    #[test]
    fn test_focus_follows_editor() {
        let mut tree = RenderTree::new("div");
        let root = tree.root();
        let display = tree.element(root, "span", &["count"]).unwrap();
        let editor = tree.element(root, "div", &[classes::EDITOR]).unwrap();
        tree.take_mutations();

        let mut set = ObserverSet::new();
        set.observe(FocusWatcher::observer(editor, display));

        tree.add_class(editor, classes::FOCUSED).unwrap();
        set.settle(&mut tree, 8).unwrap();
        assert!(tree.has_class(display, classes::FOCUSED).unwrap());

        tree.remove_class(editor, classes::FOCUSED).unwrap();
        set.settle(&mut tree, 8).unwrap();
        assert!(!tree.has_class(display, classes::FOCUSED).unwrap());
    }

    #[test]
    fn test_output_prompt_stripped_after_redraw() {
        let mut tree = RenderTree::new("div");
        let root = tree.root();
        let output = tree.element(root, "div", &[classes::OUTPUT_AREA]).unwrap();
        tree.take_mutations();

        let mut set = ObserverSet::new();
        set.observe(OutputWatcher::observer(output));

        let mut fresh = RenderTree::new("div");
        let fr = fresh.root();
        fresh.element(fr, "div", &[classes::COLLAPSER]).unwrap();
        let p = fresh.element(fr, "div", &[classes::OUTPUT_PROMPT]).unwrap();
        fresh.set_text(p, "[4]").unwrap();
        let o = fresh.element(fr, "pre", &[classes::OUTPUT]).unwrap();
        fresh.set_text(o, "42").unwrap();

        tree.replace_children_from(output, &fresh).unwrap();
        set.settle(&mut tree, 8).unwrap();

        assert!(tree.find_by_class(output, classes::OUTPUT_PROMPT).is_none());
        assert!(tree.find_by_class(output, classes::COLLAPSER).is_none());
        assert_eq!(tree.text_content(output).unwrap(), "42");
    }
}
