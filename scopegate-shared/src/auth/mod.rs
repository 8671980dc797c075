/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: Session-bound access and refresh tokens
/// - [`tokens`]: Opaque one-time tokens (email verification, password reset)
/// - [`middleware`]: Bearer authentication against active sessions
/// - [`permission`]: Permission resolver (does the user hold a grant?)
/// - [`scope`]: Scope resolver (how far does that grant reach?)
/// - [`authorization`]: Both resolvers combined into one check
///
/// # Example
///
/// ```no_run
/// use scopegate_shared::auth::password::{hash_password, verify_password};
/// use scopegate_shared::auth::jwt::issue_token_pair;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("User_passw0rd")?;
/// assert!(verify_password("User_passw0rd", &hash)?);
///
/// let pair = issue_token_pair(Uuid::new_v4(), Uuid::new_v4(), "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod permission;
pub mod scope;
pub mod tokens;
