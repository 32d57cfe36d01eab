pub use crate::features::monitor::{
    CONNECTION_DOWN, ConnectionStatus, DeviceSnapshot, Monitor, MonitorEvent, MonitorState,
    OpenOutage, ParseStatusError,
};
