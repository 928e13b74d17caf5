use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng};

pub fn short_random(n: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(n)
        .map(char::from)
        .collect()
}

/// Hashes a plaintext password into the PHC string stored as the user's
/// credential.
pub fn hash_password(password: &str) -> String {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .unwrap()
        .to_string()
}

/// Lowercases `s` and replaces runs of non-alphanumeric characters with a
/// single dash (used for download filenames).
pub fn slugify(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_dash = true;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.extend(c.to_lowercase());
            prev_dash = false;
        } else if !prev_dash {
            out.push('-');
            prev_dash = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod test_util {
    use super::{hash_password, short_random, slugify};

    #[test]
    fn test_short_random_length() {
        assert_eq!(short_random(8).len(), 8);
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("User"), "user");
        assert_eq!(slugify("User Request!"), "user-request");
        assert_eq!(slugify("  Participation  "), "participation");
    }

    #[test]
    fn test_hash_password_is_phc_encoded() {
        let hash = hash_password("hunter2");
        assert!(hash.starts_with("$argon2"));
        assert_ne!(hash, "hunter2");
    }
}
