//! Macros for declaring lifecycle state enums.

/// Declare a lifecycle enum and implement [`State`](crate::core::State) for it.
///
/// Each variant is paired with its stable snake_case name. The macro derives
/// the usual value traits, serializes variants by that name, implements
/// `Display`, and adds an `ALL` constant listing every variant in order.
///
/// # Example
///
/// ```
/// use chequeflow::state_enum;
/// use chequeflow::core::State;
///
/// state_enum! {
///     pub enum LeafStatus {
///         Blank => "blank",
///         Written => "written",
///         Voided => "voided",
///     }
///     final: [Voided]
///     error: [Voided]
/// }
///
/// assert_eq!(LeafStatus::Written.name(), "written");
/// assert!(LeafStatus::Voided.is_final());
/// assert_eq!(LeafStatus::ALL.len(), 3);
/// ```
#[macro_export]
macro_rules! state_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $label:literal
            ),* $(,)?
        }

        $(final: [$($final:ident),* $(,)?])?
        $(error: [$($error:ident),* $(,)?])?
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, serde::Serialize, serde::Deserialize)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                #[serde(rename = $label)]
                $variant
            ),*
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),*];
        }

        impl $crate::core::State for $name {
            fn name(&self) -> &str {
                match self {
                    $(Self::$variant => $label),*
                }
            }

            #[allow(unreachable_patterns)]
            fn is_final(&self) -> bool {
                match self {
                    $($(Self::$final => true,)*)?
                    _ => false,
                }
            }

            #[allow(unreachable_patterns)]
            fn is_error(&self) -> bool {
                match self {
                    $($(Self::$error => true,)*)?
                    _ => false,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str($crate::core::State::name(self))
            }
        }
    };
}
