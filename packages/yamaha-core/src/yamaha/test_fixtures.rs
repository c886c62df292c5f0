//! Shared test fixtures: captured device responses and description documents.

/// `Basic_Status` of an RX-V receiver with every optional section present.
pub const LEGACY_BASIC_STATUS: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<YAMAHA_AV rsp="GET" RC="0"><Main_Zone><Basic_Status>
<Power_Control><Power>On</Power><Sleep>Off</Sleep></Power_Control>
<Volume><Lvl><Val>-320</Val><Exp>1</Exp><Unit>dB</Unit></Lvl><Mute>Off</Mute><Subwoofer_Trim><Val>-15</Val><Exp>1</Exp><Unit>dB</Unit></Subwoofer_Trim><Scale>dB</Scale></Volume>
<Input><Input_Sel>NET RADIO</Input_Sel><Input_Sel_Item_Info><Param>NET RADIO</Param><RW>R</RW><Title>NET RADIO</Title><Icon><On>/YamahaRemoteControl/Icons/icon004.png</On><Off></Off></Icon><Src_Name>NET_RADIO</Src_Name><Src_Number>1</Src_Number></Input_Sel_Item_Info></Input>
<Surround><Program_Sel><Current><Straight>Off</Straight><Enhancer>On</Enhancer><Sound_Program>Hall in Munich</Sound_Program></Current></Program_Sel><_3D_Cinema_DSP>Auto</_3D_Cinema_DSP></Surround>
<Sound_Video><Tone><Bass><Val>0</Val><Exp>1</Exp><Unit>dB</Unit></Bass><Treble><Val>0</Val><Exp>1</Exp><Unit>dB</Unit></Treble></Tone><Direct><Mode>Off</Mode></Direct><HDMI><Standby_Through_Info>Off</Standby_Through_Info><Output><OUT_1>On</OUT_1></Output></HDMI><Adaptive_DRC>Auto</Adaptive_DRC><Extra_Bass>Off</Extra_Bass></Sound_Video>
</Basic_Status></Main_Zone></YAMAHA_AV>"#;

/// `Basic_Status` of an older model: `Vol` instead of `Volume`, `Pure_Direct`,
/// no subwoofer trim, no surround section.
pub const LEGACY_BASIC_STATUS_MINIMAL: &str = r#"<YAMAHA_AV rsp="GET" RC="0"><Main_Zone><Basic_Status>
<Power_Control><Power>Standby</Power></Power_Control>
<Vol><Lvl><Val>-455</Val><Exp>1</Exp><Unit>dB</Unit></Lvl><Mute>On</Mute></Vol>
<Input><Input_Sel>HDMI2</Input_Sel></Input>
<Sound_Video><Pure_Direct><Mode>On</Mode></Pure_Direct></Sound_Video>
</Basic_Status></Main_Zone></YAMAHA_AV>"#;

/// `Basic_Status` response missing the zone node.
pub const LEGACY_BASIC_STATUS_WRONG_ZONE: &str =
    r#"<YAMAHA_AV rsp="GET" RC="0"><Zone_2><Basic_Status></Basic_Status></Zone_2></YAMAHA_AV>"#;

/// `Play_Info` for the NET_RADIO zone with double-encoded metadata.
pub const LEGACY_PLAY_INFO_NET_RADIO: &str = r#"<YAMAHA_AV rsp="GET" RC="0"><NET_RADIO><Play_Info>
<Feature_Availability>Ready</Feature_Availability>
<Playback_Info>Play</Playback_Info>
<Meta_Info><Station>Radio 10</Station><Album></Album><Song>Simon &amp;amp; Garfunkel - The Boxer</Song></Meta_Info>
<Album_ART><URL>/YamahaRemoteControl/AlbumART/AlbumART1234.jpg</URL><ID>1234</ID><Format>JPEG</Format></Album_ART>
</Play_Info></NET_RADIO></YAMAHA_AV>"#;

/// `Play_Info` for the Spotify zone, which reports `Track` rather than `Song`.
pub const LEGACY_PLAY_INFO_SPOTIFY: &str = r#"<YAMAHA_AV rsp="GET" RC="0"><Spotify><Play_Info>
<Feature_Availability>Ready</Feature_Availability>
<Playback_Info>Pause</Playback_Info>
<Meta_Info><Artist>AC&amp;amp;DC</Artist><Album>Back in Black</Album><Track>Hells Bells</Track></Meta_Info>
</Play_Info></Spotify></YAMAHA_AV>"#;

/// `System` network name response.
pub const LEGACY_NETWORK_NAME: &str = r#"<YAMAHA_AV rsp="GET" RC="0"><System><Misc><Network><Network_Name>Living Room</Network_Name></Network></Misc></System></YAMAHA_AV>"#;

/// Legacy unit description served at `/YamahaRemoteControl/desc.xml`.
pub const LEGACY_UNIT_DESCRIPTION: &str =
    r#"<?xml version="1.0" encoding="utf-8"?><Unit_Description Version="1.2" Unit_Name="RX-V673"><Language Code="en"/></Unit_Description>"#;

/// Description document of a MusicCast device.
pub const DESCRIPTION_MUSICCAST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<root xmlns="urn:schemas-upnp-org:device-1-0" xmlns:yamaha="urn:schemas-yamaha-com:device-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <device>
    <deviceType>urn:schemas-upnp-org:device:MediaRenderer:1</deviceType>
    <friendlyName>Kitchen</friendlyName>
    <manufacturer>Yamaha Corporation</manufacturer>
    <modelDescription>MusicCast</modelDescription>
    <modelName>WX-030</modelName>
    <UDN>uuid:9ab0c000-f668-11de-9976-00a0de9a1f2c</UDN>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:AVTransport:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:AVTransport</serviceId>
        <SCPDURL>/upnp/avt/desc.xml</SCPDURL>
        <controlURL>/upnp/avt/ctrl</controlURL>
        <eventSubURL>/upnp/avt/event</eventSubURL>
      </service>
      <service>
        <serviceType>urn:schemas-upnp-org:service:RenderingControl:1</serviceType>
        <serviceId>urn:upnp-org:serviceId:RenderingControl</serviceId>
        <SCPDURL>/upnp/rc/desc.xml</SCPDURL>
        <controlURL>/upnp/rc/ctrl</controlURL>
        <eventSubURL>/upnp/rc/event</eventSubURL>
      </service>
    </serviceList>
  </device>
  <yamaha:X_device>
    <yamaha:X_URLBase>http://192.168.1.20:80/</yamaha:X_URLBase>
    <yamaha:X_serviceList>
      <yamaha:X_service>
        <yamaha:X_specType>urn:schemas-yamaha-com:service:X_YamahaRemoteControl:1</yamaha:X_specType>
        <yamaha:X_controlURL>/YamahaRemoteControl/ctrl</yamaha:X_controlURL>
        <yamaha:X_unitDescURL>/YamahaRemoteControl/desc.xml</yamaha:X_unitDescURL>
      </yamaha:X_service>
      <yamaha:X_service>
        <yamaha:X_specType>urn:schemas-yamaha-com:service:X_YamahaExtendedControl:1</yamaha:X_specType>
        <yamaha:X_yxcControlURL>/YamahaExtendedControl/v1/</yamaha:X_yxcControlURL>
        <yamaha:X_yxcVersion>1911</yamaha:X_yxcVersion>
      </yamaha:X_service>
    </yamaha:X_serviceList>
  </yamaha:X_device>
</root>"#;

/// Description document of a legacy AV receiver.
pub const DESCRIPTION_AV_RECEIVER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<root xmlns="urn:schemas-upnp-org:device-1-0" xmlns:yamaha="urn:schemas-yamaha-com:device-1-0">
  <device>
    <deviceType>urn:schemas-upnp-org:device:MediaRenderer:1</deviceType>
    <friendlyName>RX-V673 Living</friendlyName>
    <manufacturer>Yamaha Corporation</manufacturer>
    <modelDescription>AV Receiver</modelDescription>
    <modelName>RX-V673</modelName>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:AVTransport:1</serviceType>
        <eventSubURL>/AVTransport/event</eventSubURL>
      </service>
    </serviceList>
  </device>
  <yamaha:X_device>
    <yamaha:X_URLBase>http://192.168.1.8:80/</yamaha:X_URLBase>
    <yamaha:X_serviceList>
      <yamaha:X_service>
        <yamaha:X_specType>urn:schemas-yamaha-com:service:X_YamahaRemoteControl:1</yamaha:X_specType>
        <yamaha:X_controlURL>/YamahaRemoteControl/ctrl</yamaha:X_controlURL>
        <yamaha:X_unitDescURL>/YamahaRemoteControl/desc.xml</yamaha:X_unitDescURL>
      </yamaha:X_service>
    </yamaha:X_serviceList>
  </yamaha:X_device>
</root>"#;

/// AV receiver description without the vendor extension block.
pub const DESCRIPTION_AV_RECEIVER_NO_VENDOR: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <device>
    <friendlyName>Old Receiver</friendlyName>
    <modelDescription>AV Receiver</modelDescription>
    <modelName>RX-V471</modelName>
  </device>
</root>"#;

/// Media renderer from another vendor.
pub const DESCRIPTION_OTHER_VENDOR: &str = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <device>
    <friendlyName>Living Room TV</friendlyName>
    <modelDescription>Smart TV</modelDescription>
    <modelName>UE55</modelName>
  </device>
</root>"#;

/// AVTransport NOTIFY body using the LastChange format.
pub const UPNP_NOTIFY_LAST_CHANGE: &str = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property>
    <LastChange>&lt;Event xmlns=&quot;urn:schemas-upnp-org:metadata-1-0/AVT/&quot;&gt;&lt;InstanceID val=&quot;0&quot;&gt;&lt;TransportState val=&quot;PLAYING&quot;/&gt;&lt;CurrentTrackURI val=&quot;http://10.0.0.2/a.mp3&quot;/&gt;&lt;/InstanceID&gt;&lt;/Event&gt;</LastChange>
  </e:property>
</e:propertyset>"#;

/// RenderingControl NOTIFY body using the LastChange format.
pub const UPNP_NOTIFY_RENDERING: &str = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property>
    <LastChange>&lt;Event xmlns=&quot;urn:schemas-upnp-org:metadata-1-0/RCS/&quot;&gt;&lt;InstanceID val=&quot;0&quot;&gt;&lt;Volume channel=&quot;Master&quot; val=&quot;42&quot;/&gt;&lt;Mute channel=&quot;Master&quot; val=&quot;1&quot;/&gt;&lt;/InstanceID&gt;&lt;/Event&gt;</LastChange>
  </e:property>
</e:propertyset>"#;

/// NOTIFY body with plain properties instead of LastChange.
pub const UPNP_NOTIFY_PROPERTIES: &str = r#"<?xml version="1.0"?>
<e:propertyset xmlns:e="urn:schemas-upnp-org:event-1-0">
  <e:property><SystemUpdateID>12</SystemUpdateID></e:property>
  <e:property><ContainerUpdateIDs>0,4</ContainerUpdateIDs></e:property>
</e:propertyset>"#;

/// Unicast event carrying inline zone values.
pub const UNICAST_ZONE_EVENT: &str = r#"{"main":{"power":"on","input":"spotify","volume":40,"mute":false,"status_updated":true},"device_id":"00A0DED3A1B2"}"#;

/// Unicast event only flagging new play info.
pub const UNICAST_PLAY_INFO_EVENT: &str =
    r#"{"netusb":{"play_info_updated":true,"play_time":12},"device_id":"00A0DED3A1B2"}"#;
