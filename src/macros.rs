/// Defines a string identifier newtype.
///
/// Identifiers are free-form strings so records imported from elsewhere keep their ids; fresh ones are
/// random UUIDs.
///
/// # Example
///
/// ```rust,ignore
/// define_id!(WebinarId);
///
/// let id = WebinarId::random();
/// let same: WebinarId = id.to_string().into();
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn random() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Implements [Record](crate::service::store::Record) so the type can live in a [Store](crate::service::store::Store).
///
/// # Syntax
/// ```rust,ignore
/// define_record!("table name" : Model = id_field as IdType);
/// ```
#[macro_export]
macro_rules! define_record {
    ($table:literal : $model:ty = $field:ident as $id:ty) => {
        impl $crate::service::store::Record for $model {
            type Id = $id;

            fn id(&self) -> &Self::Id {
                &self.$field
            }

            fn table() -> &'static str {
                $table
            }
        }
    };
}
