//! Profile records and the patches that write them.

use time::OffsetDateTime;

use crate::event::{self, UserData};

/// A single field of a [`ProfilePatch`].
///
/// `Unchanged` leaves the stored column alone. For nullable columns,
/// `Set(None)` clears the stored value.
#[derive(Clone, Debug, PartialEq)]
pub enum Field<T> {
    Unchanged,
    Set(T),
}

impl<T> Field<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Unchanged => None,
        }
    }

    /// Apply the field to a stored value.
    pub fn apply_to(self, target: &mut T) {
        if let Self::Set(value) = self {
            *target = value;
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    /// `None` means "leave unchanged", not "clear".
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Unchanged, Self::Set)
    }
}

/// A stored profile, mirrored from the identity provider.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileRecord {
    pub external_user_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub last_sign_in_at: Option<OffsetDateTime>,
}

/// A partial write to the profile keyed by `external_user_id`.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfilePatch {
    pub external_user_id: String,
    pub email: Field<String>,
    pub first_name: Field<Option<String>>,
    pub last_name: Field<Option<String>>,
    pub avatar_url: Field<Option<String>>,
    pub created_at: Field<OffsetDateTime>,
    pub updated_at: Field<OffsetDateTime>,
    pub last_sign_in_at: Field<Option<OffsetDateTime>>,
}

impl ProfilePatch {
    /// A patch that touches nothing but names the record.
    pub fn new(external_user_id: impl Into<String>) -> Self {
        Self {
            external_user_id: external_user_id.into(),
            email: Field::Unchanged,
            first_name: Field::Unchanged,
            last_name: Field::Unchanged,
            avatar_url: Field::Unchanged,
            created_at: Field::Unchanged,
            updated_at: Field::Unchanged,
            last_sign_in_at: Field::Unchanged,
        }
    }

    /// Build the patch for a `user.created` or `user.updated` event.
    ///
    /// The email is the resolved primary address or an empty string. The
    /// creation time is only written when `created` is set, and the sign-in
    /// time only when the event carries one.
    pub fn from_user(
        user: &UserData,
        created: bool,
        now: OffsetDateTime,
    ) -> Result<Self, event::Error> {
        let created_at = if created {
            Field::Set(event::from_millis(user.created_at)?)
        } else {
            Field::Unchanged
        };

        let last_sign_in_at = match user.last_sign_in_at {
            Some(millis) => Field::Set(Some(event::from_millis(millis)?)),
            None => Field::Unchanged,
        };

        Ok(Self {
            email: Field::Set(user.primary_email().unwrap_or_default().to_string()),
            first_name: Field::Set(non_empty(&user.first_name)),
            last_name: Field::Set(non_empty(&user.last_name)),
            avatar_url: Field::Set(non_empty(&user.image_url)),
            created_at,
            updated_at: Field::Set(now),
            last_sign_in_at,
            ..Self::new(user.id.as_str())
        })
    }

    /// Build the patch for a `session.created` event.
    pub fn signed_in(external_user_id: impl Into<String>, now: OffsetDateTime) -> Self {
        Self {
            updated_at: Field::Set(now),
            last_sign_in_at: Field::Set(Some(now)),
            ..Self::new(external_user_id)
        }
    }

    /// Turn the patch into a fresh record, using `now` for timestamps the
    /// patch leaves unset.
    pub fn into_record(self, now: OffsetDateTime) -> ProfileRecord {
        let mut record = ProfileRecord {
            external_user_id: self.external_user_id.clone(),
            email: String::new(),
            first_name: None,
            last_name: None,
            avatar_url: None,
            created_at: now,
            updated_at: now,
            last_sign_in_at: None,
        };
        self.merge_into(&mut record);

        record
    }

    /// Merge the set fields into an existing record.
    pub fn merge_into(self, record: &mut ProfileRecord) {
        self.email.apply_to(&mut record.email);
        self.first_name.apply_to(&mut record.first_name);
        self.last_name.apply_to(&mut record.last_name);
        self.avatar_url.apply_to(&mut record.avatar_url);
        self.created_at.apply_to(&mut record.created_at);
        self.updated_at.apply_to(&mut record.updated_at);
        self.last_sign_in_at.apply_to(&mut record.last_sign_in_at);
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(str::to_string)
}
