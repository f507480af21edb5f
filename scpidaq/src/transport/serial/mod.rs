use anyhow::anyhow;
use tokio::task;
use tokio_serial::{SerialPortBuilderExt, SerialPortInfo, SerialPortType, SerialStream};

pub use params::{DataBits, FlowControl, Parity, SerialParams, StopBits};

pub mod params;

#[cfg(target_os = "linux")]
mod linux_low_latency;

pub(crate) fn open_serial_port(path: &str, params: &SerialParams) -> crate::Result<SerialStream> {
    log::debug!("Opening {} with {}", path, params);
    let serial_stream = tokio_serial::new(path, params.baud)
        .parity(params.parity.into())
        .stop_bits(params.stop_bits.into())
        .data_bits(params.data_bits.into())
        .flow_control(params.flow_control.into())
        .open_native_async()
        .map_err(|x| crate::Error::connection(anyhow!("{}: {}", path, x)))?;

    #[cfg(target_os = "linux")]
    {
        match linux_low_latency::set_low_latency(&serial_stream, params.low_latency) {
            Ok(_) => log::debug!("ASYNC_LOW_LATENCY on {} is {}", path, params.low_latency),
            // not supported by every driver
            Err(x) => log::warn!("Cannot change ASYNC_LOW_LATENCY on {}: {}", path, x),
        }
    }
    Ok(serial_stream)
}

fn is_usb_adapter(info: &SerialPortInfo) -> bool {
    match &info.port_type {
        SerialPortType::UsbPort(_) => true,
        _ => info.port_name.to_uppercase().contains("USB"),
    }
}

/// List serial ports which belong to USB to RS232 adapters, in the order reported by the OS.
pub async fn list_usb_ports() -> crate::Result<Vec<String>> {
    let ports = task::spawn_blocking(tokio_serial::available_ports)
        .await
        .map_err(|err| crate::Error::transport(anyhow!(err)))?
        .map_err(|err| crate::Error::transport(anyhow!(err.description)))?;
    let ret: Vec<String> = ports
        .into_iter()
        .filter(is_usb_adapter)
        .map(|x| x.port_name)
        .collect();
    log::debug!("Found USB serial ports: {:?}", ret);
    Ok(ret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(name: &str, port_type: SerialPortType) -> SerialPortInfo {
        SerialPortInfo {
            port_name: name.to_string(),
            port_type,
        }
    }

    #[test]
    fn usb_filter() {
        assert!(is_usb_adapter(&port("/dev/ttyUSB1", SerialPortType::Unknown)));
        assert!(!is_usb_adapter(&port("/dev/ttyS0", SerialPortType::Unknown)));
        assert!(!is_usb_adapter(&port("COM1", SerialPortType::PciPort)));
    }
}
