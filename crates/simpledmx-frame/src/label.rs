//! Widget message labels.
//!
//! Only [`TX_DMX_PACKET`] is sent by this crate. The others are named so
//! that packets read back from a widget can be reported in diagnostics.

/// Request the widget's configuration.
pub const GET_WIDGET_PARAMETERS: u8 = 3;

/// Store the widget's configuration.
pub const SET_WIDGET_PARAMETERS: u8 = 4;

/// A DMX frame received by the widget.
pub const RX_DMX_PACKET: u8 = 5;

/// Output a DMX frame.
pub const TX_DMX_PACKET: u8 = 6;

/// Send an RDM request.
pub const TX_RDM_PACKET_REQUEST: u8 = 7;

/// Receive only changed DMX channels.
pub const RX_DMX_ON_CHANGE: u8 = 8;

/// Returns a human-readable name for a label.
pub fn label_name(label: u8) -> &'static str {
    match label {
        GET_WIDGET_PARAMETERS => "GET_WIDGET_PARAMETERS",
        SET_WIDGET_PARAMETERS => "SET_WIDGET_PARAMETERS",
        RX_DMX_PACKET => "RX_DMX_PACKET",
        TX_DMX_PACKET => "TX_DMX_PACKET",
        TX_RDM_PACKET_REQUEST => "TX_RDM_PACKET_REQUEST",
        RX_DMX_ON_CHANGE => "RX_DMX_ON_CHANGE",
        _ => "UNKNOWN",
    }
}

/// Returns true if the label is one of the known widget messages.
pub fn is_known(label: u8) -> bool {
    (GET_WIDGET_PARAMETERS..=RX_DMX_ON_CHANGE).contains(&label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_known_labels() {
        assert_eq!(label_name(TX_DMX_PACKET), "TX_DMX_PACKET");
        assert_eq!(label_name(RX_DMX_ON_CHANGE), "RX_DMX_ON_CHANGE");
        assert_eq!(label_name(0), "UNKNOWN");
    }

    #[test]
    fn known_range() {
        assert!(is_known(TX_DMX_PACKET));
        assert!(!is_known(2));
        assert!(!is_known(9));
    }
}
