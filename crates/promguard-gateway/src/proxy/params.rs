//! Request parameters from the URL query and a form-encoded body.
//!
//! The query engine reads parameters from both places, with body values
//! first. Every rewrite therefore removes a key from *both* sources before
//! writing the enforced value back, so a stale copy can never survive in the
//! other location.

use url::form_urlencoded;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams {
    query: Vec<(String, String)>,
    form: Option<Vec<(String, String)>>,
}

fn decode(raw: &[u8]) -> Vec<(String, String)> {
    form_urlencoded::parse(raw)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn encode(pairs: &[(String, String)]) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .finish()
}

impl RequestParams {
    /// `form_body` is `Some` only for form-encoded POST bodies.
    pub fn parse(query: Option<&str>, form_body: Option<&[u8]>) -> Self {
        Self {
            query: query.map(|q| decode(q.as_bytes())).unwrap_or_default(),
            form: form_body.map(decode),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &(String, String)> {
        self.form.iter().flatten().chain(self.query.iter())
    }

    /// First value of `key`, body before URL.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// All values of `key`, body values first, each source in order.
    pub fn all(&self, key: &str) -> Vec<String> {
        self.iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn remove(&mut self, key: &str) {
        self.query.retain(|(k, _)| k != key);
        if let Some(form) = self.form.as_mut() {
            form.retain(|(k, _)| k != key);
        }
    }

    /// Replace every occurrence of `key` with `values`.
    ///
    /// Values go into the body when the request has one, else the URL.
    pub fn set(&mut self, key: &str, values: impl IntoIterator<Item = String>) {
        self.remove(key);
        let target = match self.form.as_mut() {
            Some(form) => form,
            None => &mut self.query,
        };
        target.extend(values.into_iter().map(|v| (key.to_owned(), v)));
    }

    pub fn has_form(&self) -> bool {
        self.form.is_some()
    }

    pub fn query_string(&self) -> String {
        encode(&self.query)
    }

    pub fn form_body(&self) -> Option<String> {
        self.form.as_deref().map(encode)
    }
}
