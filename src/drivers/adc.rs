// MazeTimer - Oneshot ADC Driver
//
// Gate phototransistors on ADC1, read through the raw ESP-IDF oneshot API.
// The unit is created once at boot and never released.

use esp_idf_sys as sys;
use mazetimer::config::ADC_FULL_SCALE;
use mazetimer::hal::AnalogRead;

pub struct OneshotAdc {
    handle: sys::adc_oneshot_unit_handle_t,
}

impl OneshotAdc {
    pub fn new() -> anyhow::Result<Self> {
        let mut handle: sys::adc_oneshot_unit_handle_t = core::ptr::null_mut();
        // SAFETY: plain FFI call with a fully initialised config struct.
        let ret = unsafe {
            let unit_cfg = sys::adc_oneshot_unit_init_cfg_t {
                unit_id: sys::adc_unit_t_ADC_UNIT_1,
                ulp_mode: sys::adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
                ..core::mem::zeroed()
            };
            sys::adc_oneshot_new_unit(&unit_cfg, &mut handle)
        };
        if ret != sys::ESP_OK {
            anyhow::bail!("ADC unit init failed ({})", ret);
        }
        Ok(Self { handle })
    }

    /// Configure `channel` for 11 dB attenuation (0-3.3 V), 12-bit.
    pub fn channel(&self, channel: sys::adc_channel_t) -> anyhow::Result<AdcChannel> {
        let chan_cfg = sys::adc_oneshot_chan_cfg_t {
            atten: sys::adc_atten_t_ADC_ATTEN_DB_11,
            bitwidth: sys::adc_bitwidth_t_ADC_BITWIDTH_12,
        };
        // SAFETY: `handle` came from a successful `adc_oneshot_new_unit`.
        let ret = unsafe { sys::adc_oneshot_config_channel(self.handle, channel, &chan_cfg) };
        if ret != sys::ESP_OK {
            anyhow::bail!("ADC channel {} config failed ({})", channel, ret);
        }
        Ok(AdcChannel {
            handle: self.handle,
            channel,
            last: 0,
            failing: false,
        })
    }
}

pub struct AdcChannel {
    handle: sys::adc_oneshot_unit_handle_t,
    channel: sys::adc_channel_t,
    last: u16,
    failing: bool,
}

impl AnalogRead for AdcChannel {
    /// A failed conversion repeats the previous reading.
    fn read_raw(&mut self) -> u16 {
        let mut raw: i32 = 0;
        // SAFETY: the unit outlives every channel (it is never deleted).
        let ret = unsafe { sys::adc_oneshot_read(self.handle, self.channel, &mut raw) };
        if ret == sys::ESP_OK {
            self.last = raw.clamp(0, i32::from(ADC_FULL_SCALE)) as u16;
            self.failing = false;
        } else if !self.failing {
            log::warn!("ADC channel {} read failed ({})", self.channel, ret);
            self.failing = true;
        }
        self.last
    }
}
