//! `otpauth://` URL form of a token.

use std::collections::HashMap;

use thiserror::Error;
use url::Url;

use super::{Algorithm, Factor, Generator, GeneratorError, Token, DEFAULT_DIGITS, DEFAULT_PERIOD};

const SCHEME: &str = "otpauth";
const TYPE_TOTP: &str = "totp";
const TYPE_HOTP: &str = "hotp";

const ALGORITHM_KEY: &str = "algorithm";
const DIGITS_KEY: &str = "digits";
const PERIOD_KEY: &str = "period";
const COUNTER_KEY: &str = "counter";
const ISSUER_KEY: &str = "issuer";

/// Errors converting between a [`Token`] and its URL form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenUrlError {
    /// The string is not a URL.
    #[error("malformed url: {0}")]
    Parse(String),
    /// The URL scheme is not `otpauth`.
    #[error("unsupported url scheme: {0}")]
    InvalidScheme(String),
    /// The URL host is neither `totp` nor `hotp`.
    #[error("unknown token type: {0}")]
    InvalidType(String),
    /// A required query parameter is absent.
    #[error("missing parameter: {0}")]
    MissingParameter(&'static str),
    /// A query parameter could not be parsed.
    #[error("invalid value for {parameter}: {value}")]
    InvalidParameter {
        /// Parameter name.
        parameter: &'static str,
        /// Raw value found in the URL.
        value: String,
    },
    /// The password length is not supported.
    #[error("unsupported digit count: {0}")]
    UnsupportedDigits(u8),
    /// The timer period is not usable.
    #[error("invalid timer period: {0}")]
    InvalidPeriod(u64),
}

impl From<GeneratorError> for TokenUrlError {
    fn from(err: GeneratorError) -> Self {
        match err {
            GeneratorError::UnsupportedDigits(digits) => Self::UnsupportedDigits(digits),
            GeneratorError::InvalidPeriod(period) => Self::InvalidPeriod(period),
            // Secrets never appear in the URL form.
            GeneratorError::EmptySecret => Self::MissingParameter("secret"),
        }
    }
}

impl Token {
    /// Renders the canonical URL for this token.
    ///
    /// The issuer is always written as a query parameter so that parsing the
    /// result yields an identical token.
    ///
    /// # Errors
    ///
    /// Returns an error if the generator has an unsupported digit count or
    /// timer period.
    pub fn to_url(&self) -> Result<Url, TokenUrlError> {
        self.generator.validate()?;

        let (kind, factor_key, factor_value) = match self.generator.factor {
            Factor::Counter(counter) => (TYPE_HOTP, COUNTER_KEY, counter),
            Factor::Timer { period } => (TYPE_TOTP, PERIOD_KEY, period),
        };

        let mut url = Url::parse(&format!("{SCHEME}://{kind}/"))
            .map_err(|err| TokenUrlError::Parse(err.to_string()))?;
        url.set_path(&format!("/{}", urlencoding::encode(&self.name)));
        url.query_pairs_mut()
            .append_pair(ALGORITHM_KEY, &self.generator.algorithm.to_string())
            .append_pair(DIGITS_KEY, &self.generator.digits.to_string())
            .append_pair(factor_key, &factor_value.to_string())
            .append_pair(ISSUER_KEY, &self.issuer);
        Ok(url)
    }

    /// Parses a token from its URL form.
    ///
    /// Missing `algorithm`, `digits` and `period` fall back to SHA1, 6 and 30.
    /// Without an `issuer` parameter, an `Issuer:` prefix on the label is used.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed, is not an `otpauth` URL, or
    /// carries unusable generator parameters.
    pub fn from_url(input: &str) -> Result<Self, TokenUrlError> {
        let url = Url::parse(input).map_err(|err| TokenUrlError::Parse(err.to_string()))?;
        if url.scheme() != SCHEME {
            return Err(TokenUrlError::InvalidScheme(url.scheme().to_owned()));
        }

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        let algorithm = match params.get(ALGORITHM_KEY) {
            Some(value) => value
                .parse::<Algorithm>()
                .map_err(|_| invalid(ALGORITHM_KEY, value))?,
            None => Algorithm::Sha1,
        };
        let digits = parse_or(&params, DIGITS_KEY, DEFAULT_DIGITS)?;

        let kind = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let factor = match kind.as_str() {
            TYPE_TOTP => Factor::Timer {
                period: parse_or(&params, PERIOD_KEY, DEFAULT_PERIOD)?,
            },
            TYPE_HOTP => {
                let value = params
                    .get(COUNTER_KEY)
                    .ok_or(TokenUrlError::MissingParameter(COUNTER_KEY))?;
                Factor::Counter(value.parse().map_err(|_| invalid(COUNTER_KEY, value))?)
            }
            _ => return Err(TokenUrlError::InvalidType(kind)),
        };

        let generator = Generator::new(factor, algorithm, digits);
        generator.validate()?;

        let path = url.path();
        let label = urlencoding::decode(path.strip_prefix('/').unwrap_or(path))
            .map_err(|err| TokenUrlError::Parse(err.to_string()))?
            .into_owned();
        let (issuer, name) = match params.get(ISSUER_KEY) {
            Some(issuer) => (issuer.clone(), label),
            None => match label.split_once(':') {
                Some((issuer, name)) => (issuer.to_owned(), name.trim_start().to_owned()),
                None => (String::new(), label),
            },
        };

        Ok(Self::new(name, issuer, generator))
    }
}

fn invalid(parameter: &'static str, value: &str) -> TokenUrlError {
    TokenUrlError::InvalidParameter {
        parameter,
        value: value.to_owned(),
    }
}

fn parse_or<T: std::str::FromStr>(
    params: &HashMap<String, String>,
    key: &'static str,
    default: T,
) -> Result<T, TokenUrlError> {
    params.get(key).map_or(Ok(default), |value| {
        value.parse().map_err(|_| invalid(key, value))
    })
}
