/// Application name
pub const APP_NAME: &str = "hearth";

// ---------------------------------------------------------------------------
// Storage keys
//
// Each key holds one JSON document. Collections are arrays, the credential
// store is an object keyed by lowercased email, markers hold `true`.
// ---------------------------------------------------------------------------

/// Credential records, keyed by lowercased email.
pub const USERS_KEY: &str = "users";

/// The signed-in user record.
pub const CURRENT_USER_KEY: &str = "current_user";

/// Present while a session is active.
pub const AUTHENTICATED_KEY: &str = "is_authenticated";

/// Present between signup and the first acknowledged visit.
pub const NEW_USER_KEY: &str = "is_new_user";

/// Set once demo data has been written to this partition.
pub const DEMO_INITIALIZED_KEY: &str = "demo_initialized";

pub const GROUPS_KEY: &str = "groups";
pub const GROUP_MEMBERS_KEY: &str = "group_members";
pub const GROUP_MESSAGES_KEY: &str = "group_messages";
pub const FRIENDS_KEY: &str = "friends";
pub const PROFILES_KEY: &str = "profiles";
pub const CALL_LOGS_KEY: &str = "call_logs";

/// Keys cleared on logout.
pub const SESSION_KEYS: [&str; 3] = [CURRENT_USER_KEY, AUTHENTICATED_KEY, NEW_USER_KEY];

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Length of a group invite code.
pub const INVITE_CODE_LEN: usize = 8;

/// Minimum username length accepted at signup.
pub const MIN_USERNAME_LEN: usize = 3;

/// Minimum password length accepted at signup.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Salt length for credential digests, in bytes.
pub const SALT_LEN: usize = 16;

/// Capacity of the store event channel. Slow subscribers lag past this.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
