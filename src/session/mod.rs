//! The editing session: single writer of the local graph model.

mod editor;

pub use editor::EditorSession;
