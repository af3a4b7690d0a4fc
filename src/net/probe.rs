//! PDF content-type detection.
//!
//! A URL is treated as a PDF when the server says so. HEAD is tried first
//! because it is cheap; servers that only label PDFs correctly on GET get a
//! second chance with a one-byte ranged GET. Every failure collapses to
//! "not a PDF" so the page still loads in the renderer.

use std::sync::Arc;

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, RANGE};

use super::fetch::{build_client, ClientSettings, FetchError};

/// Request shape used for one probe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    Head,
    /// GET with `Range: bytes=0-0`, so at most one body byte is transferred.
    RangedGet,
}

/// An open connection whose response headers have arrived.
///
/// Dropping the value releases the underlying connection.
pub trait ProbeConnection {
    fn header(&self, name: &str) -> Option<String>;
}

/// Opens probe connections. Redirects must already be followed.
pub trait Connector: Send + Sync {
    fn connect(&self, url: &str, method: ProbeMethod)
        -> Result<Box<dyn ProbeConnection>, FetchError>;
}

impl ProbeConnection for reqwest::blocking::Response {
    fn header(&self, name: &str) -> Option<String> {
        self.headers()
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }
}

/// Production connector backed by a blocking reqwest client.
pub struct ReqwestConnector {
    client: reqwest::blocking::Client,
}

impl ReqwestConnector {
    pub fn new(settings: &ClientSettings) -> Result<Self, FetchError> {
        Ok(Self {
            client: build_client(settings)?,
        })
    }
}

impl Connector for ReqwestConnector {
    fn connect(
        &self,
        url: &str,
        method: ProbeMethod,
    ) -> Result<Box<dyn ProbeConnection>, FetchError> {
        let request = match method {
            ProbeMethod::Head => self.client.head(url),
            ProbeMethod::RangedGet => self.client.get(url).header(RANGE, "bytes=0-0"),
        };
        let response = request.send()?;
        Ok(Box::new(response))
    }
}

/// Decides whether a URL resolves to a PDF document.
#[derive(Clone)]
pub struct ContentTypeProbe {
    connector: Arc<dyn Connector>,
}

impl ContentTypeProbe {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    /// Probe backed by a real HTTP client.
    pub fn with_settings(settings: &ClientSettings) -> Result<Self, FetchError> {
        Ok(Self::new(Arc::new(ReqwestConnector::new(settings)?)))
    }

    /// Returns true only when HEAD or the ranged GET fallback identifies a PDF.
    pub fn probe(&self, url: &str) -> bool {
        if self.check(url, ProbeMethod::Head) {
            return true;
        }
        self.check(url, ProbeMethod::RangedGet)
    }

    fn check(&self, url: &str, method: ProbeMethod) -> bool {
        let conn = match self.connector.connect(url, method) {
            Ok(conn) => conn,
            Err(e) => {
                log::debug!("PDF probe {:?} failed for {}: {}", method, url, e);
                return false;
            }
        };
        let is_pdf = is_pdf_response(
            conn.header(CONTENT_TYPE.as_str()).as_deref(),
            conn.header(CONTENT_DISPOSITION.as_str()).as_deref(),
        );
        drop(conn);
        log::debug!("PDF probe {:?} for {}: {}", method, url, is_pdf);
        is_pdf
    }
}

/// Header-level PDF test.
///
/// Media type parameters (`; charset=...`) are ignored. The disposition
/// filename only counts when no content type was sent at all.
pub fn is_pdf_response(content_type: Option<&str>, content_disposition: Option<&str>) -> bool {
    let media_type = content_type
        .map(|t| t.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
        .unwrap_or_default();

    if media_type == "application/pdf" {
        return true;
    }

    media_type.is_empty()
        && content_disposition
            .map(|d| d.to_ascii_lowercase().contains(".pdf"))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::test_server::{serve, Reply};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FakeConnection {
        content_type: Option<String>,
        disposition: Option<String>,
        closed: Arc<AtomicUsize>,
    }

    impl ProbeConnection for FakeConnection {
        fn header(&self, name: &str) -> Option<String> {
            match name {
                "content-type" => self.content_type.clone(),
                "content-disposition" => self.disposition.clone(),
                _ => None,
            }
        }
    }

    impl Drop for FakeConnection {
        fn drop(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// What the fake returns for one method.
    #[derive(Clone)]
    enum Answer {
        Headers(Option<&'static str>, Option<&'static str>),
        Fail,
    }

    struct FakeConnector {
        head: Answer,
        get: Answer,
        calls: Mutex<Vec<ProbeMethod>>,
        opened: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    impl FakeConnector {
        fn new(head: Answer, get: Answer) -> Arc<Self> {
            Arc::new(Self {
                head,
                get,
                calls: Mutex::new(Vec::new()),
                opened: Arc::new(AtomicUsize::new(0)),
                closed: Arc::new(AtomicUsize::new(0)),
            })
        }

        fn calls(&self) -> Vec<ProbeMethod> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Connector for FakeConnector {
        fn connect(
            &self,
            _url: &str,
            method: ProbeMethod,
        ) -> Result<Box<dyn ProbeConnection>, FetchError> {
            self.calls.lock().unwrap().push(method);
            let answer = match method {
                ProbeMethod::Head => self.head.clone(),
                ProbeMethod::RangedGet => self.get.clone(),
            };
            match answer {
                Answer::Fail => Err(FetchError {
                    message: "Network error".to_string(),
                }),
                Answer::Headers(ct, cd) => {
                    self.opened.fetch_add(1, Ordering::SeqCst);
                    Ok(Box::new(FakeConnection {
                        content_type: ct.map(str::to_string),
                        disposition: cd.map(str::to_string),
                        closed: Arc::clone(&self.closed),
                    }))
                }
            }
        }
    }

    #[test]
    fn head_pdf_skips_get() {
        let fake = FakeConnector::new(
            Answer::Headers(Some("application/pdf"), None),
            Answer::Fail,
        );
        let probe = ContentTypeProbe::new(fake.clone());
        assert!(probe.probe("http://example.com"));
        assert_eq!(fake.calls(), vec![ProbeMethod::Head]);
    }

    #[test]
    fn falls_back_to_ranged_get() {
        let fake = FakeConnector::new(
            Answer::Headers(Some("text/html"), None),
            Answer::Headers(Some("Application/PDF"), None),
        );
        let probe = ContentTypeProbe::new(fake.clone());
        assert!(probe.probe("http://example.com"));
        assert_eq!(fake.calls(), vec![ProbeMethod::Head, ProbeMethod::RangedGet]);
    }

    #[test]
    fn head_failure_still_tries_get() {
        let fake = FakeConnector::new(
            Answer::Fail,
            Answer::Headers(Some("application/pdf"), None),
        );
        let probe = ContentTypeProbe::new(fake.clone());
        assert!(probe.probe("http://example.com"));
    }

    #[test]
    fn both_inconclusive_is_not_pdf() {
        let fake = FakeConnector::new(
            Answer::Headers(Some("text/html"), None),
            Answer::Headers(Some("text/html"), Some("inline")),
        );
        let probe = ContentTypeProbe::new(fake.clone());
        assert!(!probe.probe("http://example.com"));
        assert_eq!(fake.calls().len(), 2);
    }

    #[test]
    fn both_failing_is_not_pdf() {
        let fake = FakeConnector::new(Answer::Fail, Answer::Fail);
        let probe = ContentTypeProbe::new(fake.clone());
        assert!(!probe.probe("http://example.com"));
    }

    #[test]
    fn every_opened_connection_is_closed_once() {
        let cases = [
            (Answer::Headers(Some("application/pdf"), None), Answer::Fail),
            (
                Answer::Headers(None, None),
                Answer::Headers(None, Some("attachment; filename=a.pdf")),
            ),
            (Answer::Fail, Answer::Headers(Some("text/plain"), None)),
            (Answer::Fail, Answer::Fail),
        ];
        for (head, get) in cases {
            let fake = FakeConnector::new(head, get);
            ContentTypeProbe::new(fake.clone()).probe("http://example.com/x");
            assert_eq!(
                fake.opened.load(Ordering::SeqCst),
                fake.closed.load(Ordering::SeqCst)
            );
        }
    }

    #[test]
    fn disposition_counts_only_without_content_type() {
        assert!(is_pdf_response(None, Some("attachment; filename=test.pdf")));
        assert!(is_pdf_response(Some(""), Some("attachment; filename=TEST.PDF")));
        assert!(!is_pdf_response(
            Some("application/octet-stream"),
            Some("attachment; filename=test.pdf")
        ));
        assert!(!is_pdf_response(None, Some("inline")));
        assert!(!is_pdf_response(None, None));
    }

    #[test]
    fn content_type_parameters_are_ignored() {
        assert!(is_pdf_response(Some("application/pdf; charset=binary"), None));
        assert!(!is_pdf_response(Some("application/pdfx"), None));
    }

    #[test]
    fn real_client_sends_range_on_fallback() {
        let server = serve(|req| {
            if req.method == "HEAD" {
                Reply::ok(vec![("Content-Type", "text/html".to_string())], b"")
            } else {
                Reply::ok(vec![("Content-Type", "application/pdf".to_string())], b"%")
            }
        });
        let probe = ContentTypeProbe::with_settings(&ClientSettings::default()).unwrap();
        assert!(probe.probe(&format!("{}/doc", server.base_url)));

        let seen = server.requests();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].method, "HEAD");
        assert_eq!(seen[1].method, "GET");
        assert_eq!(seen[1].header("range"), Some("bytes=0-0"));
    }

    #[test]
    fn unreachable_host_is_not_pdf() {
        let probe = ContentTypeProbe::with_settings(&ClientSettings::default()).unwrap();
        assert!(!probe.probe("http://127.0.0.1:1/nothing.pdf"));
        assert!(!probe.probe("not a url"));
    }
}
