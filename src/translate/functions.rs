use crate::jvm::FunctionName;
use indexmap::IndexMap;
use tracing::trace;

/// The function side of the compilation, as the type engine sees it
///
/// The method-body translator decides which functions are *used*; the type
/// engine marks implementations needed as it resolves overrides and
/// publishes each function's dispatch-table positions back. Handles are
/// compared by their `(class, method, signature)` triple.
pub trait FunctionRegistry {
    /// Has the method-body translator committed to emitting this function?
    fn is_used(&self, name: &FunctionName) -> bool;

    /// Require code for this function (overrides of used methods, itable
    /// targets, synthetic stubs)
    fn mark_as_needed(&mut self, name: &FunctionName);

    /// Publish the byte index of this function inside its class's vtable
    fn set_vtable_index(&mut self, name: &FunctionName, index: usize);

    /// The itable position published for this interface method, if any
    fn itable_index(&self, name: &FunctionName) -> Option<usize>;

    /// Publish the itable position of this interface method
    fn set_itable_index(&mut self, name: &FunctionName, index: usize);
}

#[derive(Default)]
struct FunctionState {
    needed: bool,
    vtable_index: Option<usize>,
    itable_index: Option<usize>,
}

/// Insertion-ordered registry of every function the compilation touched
///
/// Keeps states in first-touch order so embedders that assign function ids
/// by registration order get stable ids across runs.
#[derive(Default)]
pub struct FunctionManager {
    states: IndexMap<FunctionName, FunctionState>,
}

impl FunctionManager {
    pub fn new() -> FunctionManager {
        FunctionManager::default()
    }

    fn state_mut(&mut self, name: &FunctionName) -> &mut FunctionState {
        if !self.states.contains_key(name) {
            self.states.insert(name.clone(), FunctionState::default());
        }
        &mut self.states[name]
    }

    /// The vtable byte index published for this function, if any
    pub fn vtable_index(&self, name: &FunctionName) -> Option<usize> {
        self.states.get(name).and_then(|state| state.vtable_index)
    }

    /// Every needed function, in first-touch order
    pub fn needed_functions(&self) -> impl Iterator<Item = &FunctionName> {
        self.states
            .iter()
            .filter(|(_, state)| state.needed)
            .map(|(name, _)| name)
    }
}

impl FunctionRegistry for FunctionManager {
    fn is_used(&self, name: &FunctionName) -> bool {
        self.states
            .get(name)
            .map(|state| state.needed)
            .unwrap_or(false)
    }

    fn mark_as_needed(&mut self, name: &FunctionName) {
        trace!("needed function: {:?}", name);
        self.state_mut(name).needed = true;
    }

    fn set_vtable_index(&mut self, name: &FunctionName, index: usize) {
        self.state_mut(name).vtable_index = Some(index);
    }

    fn itable_index(&self, name: &FunctionName) -> Option<usize> {
        self.states.get(name).and_then(|state| state.itable_index)
    }

    fn set_itable_index(&mut self, name: &FunctionName, index: usize) {
        self.state_mut(name).itable_index = Some(index);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{BinaryName, UnqualifiedName};

    fn func(method: &str) -> FunctionName {
        FunctionName::new(
            BinaryName::OBJECT,
            UnqualifiedName::from_string(method.into()).unwrap(),
            "()V",
        )
    }

    #[test]
    fn marking_and_indices() {
        let mut functions = FunctionManager::new();
        let hash = func("hashCode");

        assert!(!functions.is_used(&hash));
        functions.mark_as_needed(&hash);
        assert!(functions.is_used(&hash));

        assert_eq!(functions.itable_index(&hash), None);
        functions.set_itable_index(&hash, 2);
        assert_eq!(functions.itable_index(&hash), Some(2));

        functions.set_vtable_index(&hash, 4);
        assert_eq!(functions.vtable_index(&hash), Some(4));
    }

    #[test]
    fn needed_functions_in_first_touch_order() {
        let mut functions = FunctionManager::new();
        functions.set_vtable_index(&func("a"), 4);
        functions.mark_as_needed(&func("b"));
        functions.mark_as_needed(&func("c"));
        let needed: Vec<String> = functions
            .needed_functions()
            .map(|f| f.method_name.as_str().to_owned())
            .collect();
        assert_eq!(needed, vec!["b", "c"]);
    }
}
