//! Layered view configuration.
//!
//! # Overview
//!
//! Settings come from two layers:
//!
//! - [`GlobalConfig`]: the shared defaults, published as an immutable, versioned
//!   [`ViewSettings`] snapshot. Writers replace the snapshot and notify subscribers once per
//!   write (or once per [`batch`](GlobalConfig::batch)).
//! - [`ViewConfig`]: per-view [`Overridable`] values on top of the snapshot it was built
//!   from. Keys that are not set locally follow the global layer after
//!   [`rebase`](ViewConfig::rebase).
//!
//! # Example
//!
//! ```rust
//! use editor_view_core::{ConfigKey, ConfigValue, GlobalConfig, ViewConfig};
//!
//! let mut global = GlobalConfig::default();
//! let mut view = ViewConfig::new(&global);
//! view.set(ConfigKey::ScrollPastEnd, ConfigValue::Bool(true)).unwrap();
//!
//! global.set(ConfigKey::TabWidth, ConfigValue::Int(8)).unwrap();
//! global.set(ConfigKey::ScrollPastEnd, ConfigValue::Bool(false)).unwrap();
//! view.rebase(&global);
//!
//! let settings = view.resolve();
//! assert_eq!(settings.tab_width, 8);
//! assert!(settings.scroll_past_end);
//! ```

use std::sync::Arc;

use crate::error::ConfigError;
use crate::layout::{WrapIndent, WrapMode};
use crate::subscription::{SubscriptionId, Subscribers};

/// Configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// Soft wrap long lines at the view width.
    DynWordWrap,
    /// Character or word boundary wrapping.
    WrapMode,
    /// Wrap at the static word-wrap column instead of the view edge, when narrower.
    DynWrapAtStaticMarker,
    /// The static word-wrap column.
    WordWrapAt,
    /// Indentation of wrapped continuation rows.
    WrapIndent,
    /// Allow scrolling the last line above the bottom of the view.
    ScrollPastEnd,
    /// Rows kept between the caret and the view edges when auto scrolling.
    AutoCenterLines,
    /// Keep selections when the caret moves without extending.
    PersistentSelection,
    /// Clamp carets to line ends (`false` enables virtual space).
    WrapCursor,
    /// Page up/down moves the caret with the view.
    PageUpDownMovesCursor,
    /// Home jumps to the first non-whitespace character first.
    SmartHome,
    /// Tab width in cells.
    TabWidth,
}

impl ConfigKey {
    /// Every key, in declaration order.
    pub const ALL: [ConfigKey; 12] = [
        ConfigKey::DynWordWrap,
        ConfigKey::WrapMode,
        ConfigKey::DynWrapAtStaticMarker,
        ConfigKey::WordWrapAt,
        ConfigKey::WrapIndent,
        ConfigKey::ScrollPastEnd,
        ConfigKey::AutoCenterLines,
        ConfigKey::PersistentSelection,
        ConfigKey::WrapCursor,
        ConfigKey::PageUpDownMovesCursor,
        ConfigKey::SmartHome,
        ConfigKey::TabWidth,
    ];

    /// `true` for keys that change line layout.
    pub fn affects_layout(self) -> bool {
        matches!(
            self,
            ConfigKey::DynWordWrap
                | ConfigKey::WrapMode
                | ConfigKey::DynWrapAtStaticMarker
                | ConfigKey::WordWrapAt
                | ConfigKey::WrapIndent
                | ConfigKey::TabWidth
        )
    }
}

/// A dynamically typed configuration value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigValue {
    /// Flag value.
    Bool(bool),
    /// Numeric value.
    Int(i64),
    /// Wrap mode value.
    WrapMode(WrapMode),
    /// Wrap indent value.
    WrapIndent(WrapIndent),
}

/// A fully resolved set of view settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSettings {
    /// Soft wrap long lines.
    pub dyn_word_wrap: bool,
    /// Character or word boundary wrapping.
    pub wrap_mode: WrapMode,
    /// Wrap at `word_wrap_at` columns when that is narrower than the view.
    pub dyn_wrap_at_static_marker: bool,
    /// Static word-wrap column.
    pub word_wrap_at: usize,
    /// Indentation of continuation rows.
    pub wrap_indent: WrapIndent,
    /// Allow the last line to scroll above the bottom row.
    pub scroll_past_end: bool,
    /// Requested caret margin in rows.
    pub auto_center_lines: usize,
    /// Keep selections on plain caret movement.
    pub persistent_selection: bool,
    /// Clamp carets to line ends.
    pub wrap_cursor: bool,
    /// Page up/down moves the caret.
    pub page_up_down_moves_cursor: bool,
    /// Smart home key.
    pub smart_home: bool,
    /// Tab width in cells.
    pub tab_width: usize,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            dyn_word_wrap: true,
            wrap_mode: WrapMode::Word,
            dyn_wrap_at_static_marker: false,
            word_wrap_at: 80,
            wrap_indent: WrapIndent::None,
            scroll_past_end: false,
            auto_center_lines: 0,
            persistent_selection: false,
            wrap_cursor: true,
            page_up_down_moves_cursor: false,
            smart_home: true,
            tab_width: 4,
        }
    }
}

impl ViewSettings {
    /// Read one key.
    pub fn get(&self, key: ConfigKey) -> ConfigValue {
        match key {
            ConfigKey::DynWordWrap => ConfigValue::Bool(self.dyn_word_wrap),
            ConfigKey::WrapMode => ConfigValue::WrapMode(self.wrap_mode),
            ConfigKey::DynWrapAtStaticMarker => ConfigValue::Bool(self.dyn_wrap_at_static_marker),
            ConfigKey::WordWrapAt => ConfigValue::Int(self.word_wrap_at as i64),
            ConfigKey::WrapIndent => ConfigValue::WrapIndent(self.wrap_indent),
            ConfigKey::ScrollPastEnd => ConfigValue::Bool(self.scroll_past_end),
            ConfigKey::AutoCenterLines => ConfigValue::Int(self.auto_center_lines as i64),
            ConfigKey::PersistentSelection => ConfigValue::Bool(self.persistent_selection),
            ConfigKey::WrapCursor => ConfigValue::Bool(self.wrap_cursor),
            ConfigKey::PageUpDownMovesCursor => {
                ConfigValue::Bool(self.page_up_down_moves_cursor)
            }
            ConfigKey::SmartHome => ConfigValue::Bool(self.smart_home),
            ConfigKey::TabWidth => ConfigValue::Int(self.tab_width as i64),
        }
    }

    /// Write one key after validating it.
    pub fn set(&mut self, key: ConfigKey, value: ConfigValue) -> Result<(), ConfigError> {
        match (key, value) {
            (ConfigKey::DynWordWrap, ConfigValue::Bool(v)) => self.dyn_word_wrap = v,
            (ConfigKey::WrapMode, ConfigValue::WrapMode(v)) => self.wrap_mode = v,
            (ConfigKey::DynWrapAtStaticMarker, ConfigValue::Bool(v)) => {
                self.dyn_wrap_at_static_marker = v
            }
            (ConfigKey::WordWrapAt, ConfigValue::Int(v)) => {
                self.word_wrap_at = positive(key, v, "must be at least 1")?
            }
            (ConfigKey::WrapIndent, ConfigValue::WrapIndent(v)) => self.wrap_indent = v,
            (ConfigKey::ScrollPastEnd, ConfigValue::Bool(v)) => self.scroll_past_end = v,
            (ConfigKey::AutoCenterLines, ConfigValue::Int(v)) => {
                self.auto_center_lines = usize::try_from(v).map_err(|_| {
                    ConfigError::InvalidValue {
                        key,
                        reason: "must not be negative",
                    }
                })?
            }
            (ConfigKey::PersistentSelection, ConfigValue::Bool(v)) => {
                self.persistent_selection = v
            }
            (ConfigKey::WrapCursor, ConfigValue::Bool(v)) => self.wrap_cursor = v,
            (ConfigKey::PageUpDownMovesCursor, ConfigValue::Bool(v)) => {
                self.page_up_down_moves_cursor = v
            }
            (ConfigKey::SmartHome, ConfigValue::Bool(v)) => self.smart_home = v,
            (ConfigKey::TabWidth, ConfigValue::Int(v)) => {
                self.tab_width = positive(key, v, "must be at least 1")?
            }
            (key, _) => {
                return Err(ConfigError::TypeMismatch {
                    key,
                    expected: expected_kind(key),
                });
            }
        }
        Ok(())
    }

    /// Keys whose values differ between `self` and `other`.
    pub fn diff(&self, other: &ViewSettings) -> Vec<ConfigKey> {
        ConfigKey::ALL
            .into_iter()
            .filter(|k| self.get(*k) != other.get(*k))
            .collect()
    }
}

fn positive(key: ConfigKey, v: i64, reason: &'static str) -> Result<usize, ConfigError> {
    usize::try_from(v)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or(ConfigError::InvalidValue { key, reason })
}

fn expected_kind(key: ConfigKey) -> &'static str {
    match key {
        ConfigKey::WrapMode => "wrap mode",
        ConfigKey::WrapIndent => "wrap indent",
        ConfigKey::WordWrapAt | ConfigKey::AutoCenterLines | ConfigKey::TabWidth => "integer",
        _ => "bool",
    }
}

/// A value that is either set locally or falls back to another layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overridable<T> {
    value: Option<T>,
}

impl<T: Clone> Overridable<T> {
    /// Not set.
    pub const fn unset() -> Self {
        Self { value: None }
    }

    /// Set to `value`.
    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    /// Clear the local value.
    pub fn clear(&mut self) {
        self.value = None;
    }

    /// `true` if a local value is present.
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// The local value, if any.
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The local value, or `fallback`.
    pub fn resolve(&self, fallback: &T) -> T {
        self.value.clone().unwrap_or_else(|| fallback.clone())
    }
}

impl<T: Clone> Default for Overridable<T> {
    fn default() -> Self {
        Self::unset()
    }
}

/// Notification sent by [`GlobalConfig`] after a write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigChange {
    /// Version of the new snapshot.
    pub version: u64,
    /// Keys whose value changed.
    pub keys: Vec<ConfigKey>,
}

/// Shared default settings with change notification.
pub struct GlobalConfig {
    snapshot: Arc<ViewSettings>,
    version: u64,
    subscribers: Subscribers<ConfigChange>,
}

impl GlobalConfig {
    /// Start from `settings`.
    pub fn new(settings: ViewSettings) -> Self {
        Self {
            snapshot: Arc::new(settings),
            version: 0,
            subscribers: Subscribers::new(),
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Arc<ViewSettings> {
        Arc::clone(&self.snapshot)
    }

    /// Snapshot version, bumped on every effective write.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Subscribe to change notifications.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ConfigChange) + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Detach a change callback.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }

    /// Write one key.
    pub fn set(&mut self, key: ConfigKey, value: ConfigValue) -> Result<(), ConfigError> {
        self.batch([(key, value)])
    }

    /// Write several keys atomically with a single notification.
    ///
    /// Nothing is applied if any value is rejected.
    pub fn batch<I>(&mut self, changes: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (ConfigKey, ConfigValue)>,
    {
        let mut next = (*self.snapshot).clone();
        for (key, value) in changes {
            next.set(key, value)?;
        }
        let keys = self.snapshot.diff(&next);
        if keys.is_empty() {
            return Ok(());
        }
        self.snapshot = Arc::new(next);
        self.version = self.version.saturating_add(1);
        tracing::debug!(version = self.version, ?keys, "global view config changed");
        self.subscribers.notify(&ConfigChange {
            version: self.version,
            keys,
        });
        Ok(())
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self::new(ViewSettings::default())
    }
}

#[derive(Debug, Clone, Default)]
struct LocalOverrides {
    dyn_word_wrap: Overridable<bool>,
    wrap_mode: Overridable<WrapMode>,
    dyn_wrap_at_static_marker: Overridable<bool>,
    word_wrap_at: Overridable<usize>,
    wrap_indent: Overridable<WrapIndent>,
    scroll_past_end: Overridable<bool>,
    auto_center_lines: Overridable<usize>,
    persistent_selection: Overridable<bool>,
    wrap_cursor: Overridable<bool>,
    page_up_down_moves_cursor: Overridable<bool>,
    smart_home: Overridable<bool>,
    tab_width: Overridable<usize>,
}

/// Per-view settings: local overrides on top of a global snapshot.
#[derive(Debug, Clone)]
pub struct ViewConfig {
    global: Arc<ViewSettings>,
    global_version: u64,
    local: LocalOverrides,
}

impl ViewConfig {
    /// A view config with no local overrides.
    pub fn new(global: &GlobalConfig) -> Self {
        Self {
            global: global.snapshot(),
            global_version: global.version(),
            local: LocalOverrides::default(),
        }
    }

    /// A view config over a fixed snapshot, for hosts without a global layer.
    pub fn from_settings(settings: ViewSettings) -> Self {
        Self {
            global: Arc::new(settings),
            global_version: 0,
            local: LocalOverrides::default(),
        }
    }

    /// Adopt the current global snapshot. Returns `true` if the resolved settings changed.
    pub fn rebase(&mut self, global: &GlobalConfig) -> bool {
        if self.global_version == global.version() && Arc::ptr_eq(&self.global, &global.snapshot)
        {
            return false;
        }
        let before = self.resolve();
        self.global = global.snapshot();
        self.global_version = global.version();
        before != self.resolve()
    }

    /// Set a local value for `key`.
    pub fn set(&mut self, key: ConfigKey, value: ConfigValue) -> Result<(), ConfigError> {
        // Validate through a scratch settings value, then store the typed result.
        let mut scratch = self.resolve();
        scratch.set(key, value)?;
        let l = &mut self.local;
        match key {
            ConfigKey::DynWordWrap => l.dyn_word_wrap.set(scratch.dyn_word_wrap),
            ConfigKey::WrapMode => l.wrap_mode.set(scratch.wrap_mode),
            ConfigKey::DynWrapAtStaticMarker => {
                l.dyn_wrap_at_static_marker.set(scratch.dyn_wrap_at_static_marker)
            }
            ConfigKey::WordWrapAt => l.word_wrap_at.set(scratch.word_wrap_at),
            ConfigKey::WrapIndent => l.wrap_indent.set(scratch.wrap_indent),
            ConfigKey::ScrollPastEnd => l.scroll_past_end.set(scratch.scroll_past_end),
            ConfigKey::AutoCenterLines => l.auto_center_lines.set(scratch.auto_center_lines),
            ConfigKey::PersistentSelection => {
                l.persistent_selection.set(scratch.persistent_selection)
            }
            ConfigKey::WrapCursor => l.wrap_cursor.set(scratch.wrap_cursor),
            ConfigKey::PageUpDownMovesCursor => l
                .page_up_down_moves_cursor
                .set(scratch.page_up_down_moves_cursor),
            ConfigKey::SmartHome => l.smart_home.set(scratch.smart_home),
            ConfigKey::TabWidth => l.tab_width.set(scratch.tab_width),
        }
        Ok(())
    }

    /// Remove the local value for `key`, falling back to the global layer.
    pub fn unset(&mut self, key: ConfigKey) {
        let l = &mut self.local;
        match key {
            ConfigKey::DynWordWrap => l.dyn_word_wrap.clear(),
            ConfigKey::WrapMode => l.wrap_mode.clear(),
            ConfigKey::DynWrapAtStaticMarker => l.dyn_wrap_at_static_marker.clear(),
            ConfigKey::WordWrapAt => l.word_wrap_at.clear(),
            ConfigKey::WrapIndent => l.wrap_indent.clear(),
            ConfigKey::ScrollPastEnd => l.scroll_past_end.clear(),
            ConfigKey::AutoCenterLines => l.auto_center_lines.clear(),
            ConfigKey::PersistentSelection => l.persistent_selection.clear(),
            ConfigKey::WrapCursor => l.wrap_cursor.clear(),
            ConfigKey::PageUpDownMovesCursor => l.page_up_down_moves_cursor.clear(),
            ConfigKey::SmartHome => l.smart_home.clear(),
            ConfigKey::TabWidth => l.tab_width.clear(),
        }
    }

    /// `true` if `key` has a local value.
    pub fn is_set(&self, key: ConfigKey) -> bool {
        let l = &self.local;
        match key {
            ConfigKey::DynWordWrap => l.dyn_word_wrap.is_set(),
            ConfigKey::WrapMode => l.wrap_mode.is_set(),
            ConfigKey::DynWrapAtStaticMarker => l.dyn_wrap_at_static_marker.is_set(),
            ConfigKey::WordWrapAt => l.word_wrap_at.is_set(),
            ConfigKey::WrapIndent => l.wrap_indent.is_set(),
            ConfigKey::ScrollPastEnd => l.scroll_past_end.is_set(),
            ConfigKey::AutoCenterLines => l.auto_center_lines.is_set(),
            ConfigKey::PersistentSelection => l.persistent_selection.is_set(),
            ConfigKey::WrapCursor => l.wrap_cursor.is_set(),
            ConfigKey::PageUpDownMovesCursor => l.page_up_down_moves_cursor.is_set(),
            ConfigKey::SmartHome => l.smart_home.is_set(),
            ConfigKey::TabWidth => l.tab_width.is_set(),
        }
    }

    /// Resolve one key.
    pub fn resolve_key(&self, key: ConfigKey) -> ConfigValue {
        self.resolve().get(key)
    }

    /// Resolve every key.
    pub fn resolve(&self) -> ViewSettings {
        let g = &*self.global;
        let l = &self.local;
        ViewSettings {
            dyn_word_wrap: l.dyn_word_wrap.resolve(&g.dyn_word_wrap),
            wrap_mode: l.wrap_mode.resolve(&g.wrap_mode),
            dyn_wrap_at_static_marker: l
                .dyn_wrap_at_static_marker
                .resolve(&g.dyn_wrap_at_static_marker),
            word_wrap_at: l.word_wrap_at.resolve(&g.word_wrap_at),
            wrap_indent: l.wrap_indent.resolve(&g.wrap_indent),
            scroll_past_end: l.scroll_past_end.resolve(&g.scroll_past_end),
            auto_center_lines: l.auto_center_lines.resolve(&g.auto_center_lines),
            persistent_selection: l.persistent_selection.resolve(&g.persistent_selection),
            wrap_cursor: l.wrap_cursor.resolve(&g.wrap_cursor),
            page_up_down_moves_cursor: l
                .page_up_down_moves_cursor
                .resolve(&g.page_up_down_moves_cursor),
            smart_home: l.smart_home.resolve(&g.smart_home),
            tab_width: l.tab_width.resolve(&g.tab_width),
        }
    }
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self::from_settings(ViewSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_overridable_falls_back() {
        let mut v = Overridable::<usize>::unset();
        assert_eq!(v.resolve(&7), 7);
        v.set(3);
        assert_eq!(v.resolve(&7), 3);
        v.clear();
        assert!(!v.is_set());
    }

    #[test]
    fn test_unset_keys_follow_global_changes() {
        let mut global = GlobalConfig::default();
        let mut view = ViewConfig::new(&global);
        view.set(ConfigKey::AutoCenterLines, ConfigValue::Int(2)).unwrap();

        global
            .batch([
                (ConfigKey::AutoCenterLines, ConfigValue::Int(5)),
                (ConfigKey::DynWordWrap, ConfigValue::Bool(false)),
            ])
            .unwrap();
        assert!(view.rebase(&global));

        let s = view.resolve();
        assert_eq!(s.auto_center_lines, 2);
        assert!(!s.dyn_word_wrap);

        view.unset(ConfigKey::AutoCenterLines);
        assert_eq!(view.resolve_key(ConfigKey::AutoCenterLines), ConfigValue::Int(5));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut global = GlobalConfig::default();
        assert_eq!(
            global.set(ConfigKey::AutoCenterLines, ConfigValue::Int(-1)),
            Err(ConfigError::InvalidValue {
                key: ConfigKey::AutoCenterLines,
                reason: "must not be negative"
            })
        );
        assert!(global.set(ConfigKey::WordWrapAt, ConfigValue::Int(0)).is_err());
        assert_eq!(
            global.set(ConfigKey::TabWidth, ConfigValue::Bool(true)),
            Err(ConfigError::TypeMismatch {
                key: ConfigKey::TabWidth,
                expected: "integer"
            })
        );
        assert_eq!(global.version(), 0);

        let mut view = ViewConfig::new(&global);
        assert!(view.set(ConfigKey::TabWidth, ConfigValue::Int(-4)).is_err());
        assert!(!view.is_set(ConfigKey::TabWidth));
    }

    #[test]
    fn test_batch_notifies_once_with_changed_keys() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut global = GlobalConfig::default();
        {
            let seen = Rc::clone(&seen);
            global.subscribe(move |c| seen.borrow_mut().push(c.clone()));
        }

        global
            .batch([
                (ConfigKey::ScrollPastEnd, ConfigValue::Bool(true)),
                (ConfigKey::TabWidth, ConfigValue::Int(4)),
            ])
            .unwrap();
        // No-op write: nothing changes, nothing is sent.
        global.set(ConfigKey::TabWidth, ConfigValue::Int(4)).unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![ConfigChange {
                version: 1,
                keys: vec![ConfigKey::ScrollPastEnd]
            }]
        );
    }

    #[test]
    fn test_layout_keys() {
        assert!(ConfigKey::WordWrapAt.affects_layout());
        assert!(!ConfigKey::ScrollPastEnd.affects_layout());
    }
}
