//! Newtype IDs for type-safe entity references.
//!
//! Most tables use `SERIAL` keys; users are keyed by UUID because their rows
//! are created by the external auth provider. Both kinds go through the same
//! `define_id!` macro so handlers can never pass a `BranchId` where a
//! `ProductId` is expected.

/// Macro to define a type-safe ID wrapper around an inner key type.
///
/// Creates a newtype with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Display`
/// - `new()` and `get()` accessors plus `From` conversions both ways
/// - `sqlx` `Type`, `Encode`, and `Decode` delegating to the inner type
///   (with `postgres` feature)
///
/// # Example
///
/// ```rust
/// # use dengo_core::define_id;
/// define_id!(TableId: i32);
/// define_id!(SeatId: i32);
///
/// let table = TableId::new(4);
/// let seat = SeatId::new(4);
///
/// // Different types, so this won't compile:
/// // let _: TableId = seat;
/// assert_eq!(table.get(), seat.get());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident : $inner:ty) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name($inner);

        impl $name {
            /// Wrap a raw key.
            #[must_use]
            pub const fn new(id: $inner) -> Self {
                Self(id)
            }

            /// Get the raw key.
            #[must_use]
            pub const fn get(&self) -> $inner {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Type<::sqlx::Postgres> for $name {
            fn type_info() -> ::sqlx::postgres::PgTypeInfo {
                <$inner as ::sqlx::Type<::sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &::sqlx::postgres::PgTypeInfo) -> bool {
                <$inner as ::sqlx::Type<::sqlx::Postgres>>::compatible(ty)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::postgres::PgHasArrayType for $name {
            fn array_type_info() -> ::sqlx::postgres::PgTypeInfo {
                <$inner as ::sqlx::postgres::PgHasArrayType>::array_type_info()
            }
        }

        #[cfg(feature = "postgres")]
        impl<'r> ::sqlx::Decode<'r, ::sqlx::Postgres> for $name {
            fn decode(
                value: ::sqlx::postgres::PgValueRef<'r>,
            ) -> ::core::result::Result<Self, ::sqlx::error::BoxDynError> {
                <$inner as ::sqlx::Decode<::sqlx::Postgres>>::decode(value).map(Self)
            }
        }

        #[cfg(feature = "postgres")]
        impl ::sqlx::Encode<'_, ::sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut ::sqlx::postgres::PgArgumentBuffer,
            ) -> ::std::result::Result<::sqlx::encode::IsNull, ::sqlx::error::BoxDynError> {
                <$inner as ::sqlx::Encode<::sqlx::Postgres>>::encode_by_ref(&self.0, buf)
            }
        }
    };
}

define_id!(UserId: ::uuid::Uuid);

define_id!(RoleId: i32);
define_id!(TierId: i32);
define_id!(BranchId: i32);
define_id!(CategoryId: i32);
define_id!(ProductId: i32);
define_id!(IngredientId: i32);
define_id!(OrderId: i32);
define_id!(OrderItemId: i32);
define_id!(PaymentId: i32);
define_id!(EventId: i32);
define_id!(AttendanceId: i32);
define_id!(PromotionId: i32);
define_id!(RecipeId: i32);
define_id!(FavoriteId: i32);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_id_serializes_as_number() {
        let id = ProductId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        let back: ProductId = serde_json::from_str("42").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_user_id_serializes_as_uuid_string() {
        let raw = uuid::Uuid::new_v4();
        let id = UserId::new(raw);
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            format!("\"{raw}\"")
        );
        assert_eq!(id.to_string(), raw.to_string());
    }

    #[test]
    fn test_conversions() {
        let id: BranchId = 7.into();
        let raw: i32 = id.into();
        assert_eq!(raw, 7);
    }
}
