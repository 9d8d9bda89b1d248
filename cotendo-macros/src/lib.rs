#[macro_export]
/// The `extract_params!` macro pulls fields out of a request builder and lays them out as
/// the ordered `(name, value)` parameter list of a remote call.
///
/// This macro supports:
/// - Extracting required fields, returning early with an error when one is missing
/// - Extracting optional fields, using a default value if they don't exist
/// - Renaming fields to the parameter names the remote method expects
///
/// # Usage
///
/// ```rust,ignore
/// let params = extract_params!(builder, CotendoError::MissingParam, {
///     required field1 => "wireName1",
///     optional field2 = default_value => "wireName2"
/// });
/// ```
///
/// Where:
/// - `builder` is the builder object containing `Option<_>` fields
/// - `CotendoError::MissingParam` is called with the field name when a required field is `None`
/// - every field type (and every default) must implement `Display`
/// - the result is a `Vec<(&'static str, String)>` in declaration order
///
macro_rules! extract_params {
    // Parse required field: stringify the value, or leave the enclosing fn with the error
    (@extract_required $builder:expr, $missing:expr, $field:ident) => {
        match &$builder.$field {
            ::std::option::Option::Some(value) => ::std::string::ToString::to_string(value),
            ::std::option::Option::None => {
                return ::std::result::Result::Err(($missing)(stringify!($field)).into())
            }
        }
    };

    // Parse optional field: fall back to the default when unset
    (@extract_optional $builder:expr, $field:ident, $default:expr) => {
        match &$builder.$field {
            ::std::option::Option::Some(value) => ::std::string::ToString::to_string(value),
            ::std::option::Option::None => ::std::string::ToString::to_string(&$default),
        }
    };

    // Main macro
    (
        $builder:expr,
        $missing:expr,
        {
            $( required $req_field:ident => $req_key:literal ),* $(,)*
            $( optional $opt_field:ident = $opt_default:expr => $opt_key:literal ),* $(,)*
        }
    ) => {{
        let params: ::std::vec::Vec<(&'static str, ::std::string::String)> = ::std::vec![
            $(
                ($req_key, $crate::extract_params!(@extract_required $builder, $missing, $req_field)),
            )*
            $(
                ($opt_key, $crate::extract_params!(@extract_optional $builder, $opt_field, $opt_default)),
            )*
        ];
        params
    }};
}
