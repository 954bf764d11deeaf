//! Input probe: synthesized keystrokes must reach the registered data
//! callback byte-for-byte: plain characters, CSI/SS3 arrow sequences,
//! and the interrupt byte.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::engine::TerminalEngine;

/// One captured input event, with its byte codes for diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedInput {
    /// The data string the callback received.
    pub data: String,
    /// Its bytes.
    pub codes: Vec<u8>,
}

/// Input probe results.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputResults {
    /// The data callback fired at all.
    pub on_data_callback_works: bool,
    /// A plain typed character arrived unchanged.
    pub standard_typing_works: bool,
    /// An arrow key arrived as a CSI or SS3 sequence.
    pub arrow_keys_work: bool,
    /// Ctrl+C arrived as the 0x03 interrupt byte.
    pub ctrl_c_works: bool,
    /// Everything the callback captured, in order.
    pub captured_inputs: Vec<CapturedInput>,
}

/// Exercise the input feedback path.
pub fn probe_input(engine: &mut dyn TerminalEngine) -> InputResults {
    let captured: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&captured);
    engine.set_on_input(Some(Box::new(move |data| {
        sink.borrow_mut().push(data.to_string());
    })));

    engine.feed_input("x");
    let typed = captured.borrow().last().cloned();

    engine.feed_input("\x1b[A");
    let arrow = captured.borrow().last().cloned();

    engine.feed_input("\x03");
    let interrupt = captured.borrow().last().cloned();

    engine.set_on_input(None);

    let standard_typing_works = typed.as_deref() == Some("x");
    let arrow_keys_work = arrow.as_deref().is_some_and(|seq| {
        let bytes = seq.as_bytes();
        // CSI A or SS3 A
        bytes.len() >= 3
            && bytes[0] == 0x1b
            && (bytes[1] == b'[' || bytes[1] == b'O')
            && bytes[2] == b'A'
    });
    let ctrl_c_works = interrupt.as_deref().is_some_and(|seq| seq.as_bytes() == [0x03]);

    let captured_inputs = captured
        .borrow()
        .iter()
        .map(|data| CapturedInput {
            codes: data.bytes().collect(),
            data: data.clone(),
        })
        .collect();

    let results = InputResults {
        on_data_callback_works: !captured.borrow().is_empty(),
        standard_typing_works,
        arrow_keys_work,
        ctrl_c_works,
        captured_inputs,
    };
    if results.on_data_callback_works {
        log::info!("input feedback: {} events captured", captured.borrow().len());
    } else {
        log::warn!("input feedback: callback never fired");
    }
    results
}
