//! Scripted FLRig for integration tests.
//!
//! Response builders render the exact framing FLRig's XML-RPC server
//! sends, and [`flrig_mock`] routes every method the rig service uses to
//! a plausible answer. Tests override individual routes with
//! [`ScriptedTransport::route`] before opening.

use flrig_link::adapters::time::RecordingDelay;
use flrig_link::app::FlrigRig;
use flrig_link::config::LinkConfig;
use flrig_link::rpc::transport::ScriptedTransport;

pub type TestRig = FlrigRig<ScriptedTransport, RecordingDelay>;

/// Methods the open sequence calls, in order, when every probe succeeds.
pub const OPEN_SEQUENCE: [&str; 10] = [
    "main.get_version",
    "rig.get_xcvr",
    "rig.get_pwrmeter_scale",
    "rig.get_modeA",
    "rig.get_vfoA",
    "rig.get_bwA",
    "rig.set_bwA",
    "rig.get_AB",
    "rig.get_modes",
    "rig.get_split",
];

/// Mode list the scripted rig reports.
pub const MODE_LIST: [&str; 7] = ["USB", "LSB", "USB-D", "DATA-U", "AM", "CW", "DRM"];

// ── Response builders ─────────────────────────────────────────

fn respond(body: &str) -> String {
    format!(
        "HTTP/1.1 200 OK\r\n\
         Server: XMLRPC++ 0.8\r\n\
         Content-Type: text/xml\r\n\
         Content-length: {}\r\n\
         \r\n\
         <?xml version=\"1.0\"?>\r\n\
         {body}\r\n",
        body.len() + 2
    )
}

fn params(value: &str) -> String {
    respond(&format!(
        "<methodResponse><params><param>\r\n\t{value}\r\n</param>\r\n</params>\r\n</methodResponse>"
    ))
}

/// `<value>TEXT</value>`
pub fn ok_value(text: &str) -> String {
    params(&format!("<value>{text}</value>"))
}

pub fn ok_i4(n: i32) -> String {
    params(&format!("<value><i4>{n}</i4></value>"))
}

pub fn ok_double(d: f64) -> String {
    params(&format!("<value><double>{d}</double></value>"))
}

pub fn ok_array(items: &[&str]) -> String {
    let values: String = items.iter().map(|i| format!("<value>{i}</value>")).collect();
    params(&format!("<value><array><data>{values}</data></array></value>"))
}

/// What FLRig sends back for setters: a value with nothing in it.
pub fn ok_empty() -> String {
    params("<value></value>")
}

pub fn fault(code: i32, message: &str) -> String {
    respond(&format!(
        "<methodResponse><fault>\r\n\t<value><struct>\
         <member><name>faultCode</name><value><i4>{code}</i4></value></member>\
         <member><name>faultString</name><value>{message}</value></member>\
         </struct></value>\r\n</fault></methodResponse>"
    ))
}

pub fn unknown_method(method: &str) -> String {
    fault(-1, &format!("{method}: unknown method name"))
}

// ── Scripted rig ──────────────────────────────────────────────

/// A scripted FLRig reporting `version`, with VFO A on 20 m FT8 and
/// VFO B on 40 m LSB.
pub fn flrig_mock(version: &str) -> ScriptedTransport {
    let mut t = ScriptedTransport::new();
    t.route("main.get_version", ok_value(version))
        .route("rig.get_xcvr", ok_value("IC-7300"))
        .route("rig.get_pwrmeter_scale", ok_value("100"))
        .route("rig.get_modeA", ok_value("USB"))
        .route("rig.get_modeB", ok_value("LSB"))
        .route("rig.get_mode", ok_value("USB"))
        .route("rig.get_vfoA", ok_value("14074000"))
        .route("rig.get_vfoB", ok_value("7074000"))
        .route("rig.get_bwA", ok_value("2400"))
        .route("rig.get_bwB", ok_value("2700"))
        .route("rig.get_bw", ok_value("2400"))
        .route("rig.get_AB", ok_value("A"))
        .route("rig.get_modes", ok_array(&MODE_LIST))
        .route("rig.get_split", ok_i4(0))
        .route("rig.get_ptt", ok_i4(0))
        .route("rig.get_smeter", ok_i4(60))
        .route("rig.get_power", ok_value("50"))
        .route("rig.get_volume", ok_value("75"))
        .route("rig.get_pwrmeter", ok_value("0.4"));
    for setter in [
        "rig.set_vfoA",
        "rig.set_vfoB",
        "rig.set_verify_vfoA",
        "rig.set_verify_vfoB",
        "rig.set_mode",
        "rig.set_modeA",
        "rig.set_modeB",
        "rig.set_bw",
        "rig.set_bwA",
        "rig.set_bwB",
        "rig.set_AB",
        "rig.set_ptt",
        "rig.set_ptt_fast",
        "rig.set_split",
        "rig.set_power",
        "rig.set_volume",
        "rig.tune",
        "rig.cat_string",
    ] {
        t.route(setter, ok_empty());
    }
    t
}

/// Open a rig over `transport` with `config`.
pub fn open_with(transport: ScriptedTransport, config: &LinkConfig) -> TestRig {
    let mut rig = FlrigRig::new(transport, RecordingDelay::new(), config);
    rig.open().expect("open sequence");
    rig
}

/// Open a rig on a default scripted FLRig 1.4.7.
pub fn opened() -> TestRig {
    open_with(flrig_mock("1.4.7"), &LinkConfig::default())
}

/// Methods called since `mark` (a previous `calls().len()`).
pub fn calls_since(rig: &TestRig, mark: usize) -> Vec<String> {
    rig.transport().calls()[mark..].to_vec()
}

/// The most recent request envelope.
pub fn last_envelope(rig: &TestRig) -> &str {
    rig.transport().envelopes().last().map_or("", String::as_str)
}
