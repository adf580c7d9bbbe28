use crate::{Error, FieldDef, Result, Value};
use log::Level;
use std::{
    borrow::Cow,
    error,
    fmt::{self, Debug, Display},
    sync::{Arc, OnceLock},
};

/// Renames a column: `(operation, column, field)`.
pub type NameConv = Arc<dyn Fn(&str, &str, &FieldDef) -> String + Send + Sync>;
/// Converts an argument before binding or scanning:
/// `(operation, column, function, field, value)`.
pub type ParamConv =
    Arc<dyn Fn(&str, &str, &str, Option<&FieldDef>, Value) -> Value + Send + Sync>;
/// Produces the error returned when a row oriented call found nothing.
pub type NoRowsFactory = Arc<dyn Fn() -> Error + Send + Sync>;

/// No row matched a row oriented statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoRows;

impl Display for NoRows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("no rows in result set")
    }
}

impl error::Error for NoRows {}

pub fn is_no_rows(error: &Error) -> bool {
    error.downcast_ref::<NoRows>().is_some()
}

/// Generation and mapping settings.
///
/// A `Crud` carries no per call state, the same instance can serve any number
/// of concurrent calls. Configure it before sharing it.
#[derive(Clone)]
pub struct Crud {
    /// Placeholder template, `%v` is replaced by the 1 based argument index.
    pub arg_format: Cow<'static, str>,
    /// Prepended to every table name.
    pub table_prefix: String,
    /// Log every generated statement.
    pub verbose: bool,
    pub log_level: Level,
    /// Replaces [`NoRows`] in the results of row oriented calls.
    pub no_rows: Option<NoRowsFactory>,
    pub name_conv: Option<NameConv>,
    pub param_conv: Option<ParamConv>,
}

impl Default for Crud {
    fn default() -> Self {
        Self {
            arg_format: Cow::Borrowed("$%v"),
            table_prefix: String::new(),
            verbose: false,
            log_level: Level::Debug,
            no_rows: None,
            name_conv: None,
            param_conv: None,
        }
    }
}

impl Debug for Crud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crud")
            .field("arg_format", &self.arg_format)
            .field("table_prefix", &self.table_prefix)
            .field("verbose", &self.verbose)
            .field("log_level", &self.log_level)
            .field("no_rows", &self.no_rows.as_ref().map(|_| ".."))
            .field("name_conv", &self.name_conv.as_ref().map(|_| ".."))
            .field("param_conv", &self.param_conv.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Crud {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn with_arg_format(mut self, arg_format: impl Into<Cow<'static, str>>) -> Self {
        self.arg_format = arg_format.into();
        self
    }
    pub fn with_table_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.table_prefix = prefix.into();
        self
    }
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
    pub fn with_log_level(mut self, level: Level) -> Self {
        self.log_level = level;
        self
    }
    pub fn with_no_rows(mut self, factory: impl Fn() -> Error + Send + Sync + 'static) -> Self {
        self.no_rows = Some(Arc::new(factory));
        self
    }
    pub fn with_name_conv(
        mut self,
        conv: impl Fn(&str, &str, &FieldDef) -> String + Send + Sync + 'static,
    ) -> Self {
        self.name_conv = Some(Arc::new(conv));
        self
    }
    pub fn with_param_conv(
        mut self,
        conv: impl Fn(&str, &str, &str, Option<&FieldDef>, Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.param_conv = Some(Arc::new(conv));
        self
    }

    /// The error reported when a row oriented call found nothing.
    pub fn no_rows_error(&self) -> Error {
        match &self.no_rows {
            Some(factory) => factory(),
            None => Error::new(NoRows),
        }
    }

    /// Replace a [`NoRows`] coming from the queryer with the configured error.
    pub(crate) fn normalize_no_rows(&self, error: Error) -> Error {
        if self.no_rows.is_some() && is_no_rows(&error) {
            self.no_rows_error()
        } else {
            error
        }
    }

    /// Column name of `field` for the operation `on`.
    pub fn column_name<'d>(&self, on: &str, field: &'d FieldDef) -> Cow<'d, str> {
        match &self.name_conv {
            Some(conv) => Cow::Owned(conv(on, field.column, field)),
            None => Cow::Borrowed(field.column),
        }
    }

    /// Argument conversion hook, identity unless configured.
    pub fn param(
        &self,
        on: &str,
        name: &str,
        func: &str,
        field: Option<&FieldDef>,
        value: Value,
    ) -> Value {
        match &self.param_conv {
            Some(conv) => conv(on, name, func, field, value),
            None => value,
        }
    }
}

static SHARED: OnceLock<Crud> = OnceLock::new();

/// Install the process wide default configuration. Call it once at start up,
/// before the first use of [`shared`].
pub fn install(crud: Crud) -> Result<()> {
    SHARED.set(crud).map_err(|_| {
        Error::msg("The default crud configuration is already installed or in use")
    })
}

/// The process wide default configuration used by the free functions.
pub fn shared() -> &'static Crud {
    SHARED.get_or_init(Crud::default)
}
