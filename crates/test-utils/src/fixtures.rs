//! Common test fixtures for the request translator tests.
//!
//! Documents are written the way real clients send them: prefixed
//! elements, extra namespace declarations and schema locations.

/// Common BBOX parameter values.
pub mod bbox {
    /// Four coordinates, no CRS.
    pub const PLAIN: &str = "18.54,-72.3544,18.62,-72.2564";

    /// Four coordinates and a CRS.
    pub const WITH_CRS: &str = "190000,470000,200000,480000,urn:ogc:def:crs:EPSG::28992";

    /// Only three coordinates
    pub const TOO_FEW: &str = "18.54,-72.3544,18.62";

    /// Non-numeric coordinate
    pub const NOT_A_NUMBER: &str = "18.54,north,18.62,-72.2564";
}

/// XML request documents.
pub mod xml {
    pub const GET_CAPABILITIES_WFS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GetCapabilities service="WFS" version="2.0.0" xmlns="http://www.opengis.net/wfs/2.0"/>"#;

    pub const DESCRIBE_FEATURE_TYPE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:DescribeFeatureType service="WFS" version="2.0.0"
    xmlns:wfs="http://www.opengis.net/wfs/2.0"
    xmlns:kad="http://kadaster.nl">
  <wfs:TypeName>kad:Perceel</wfs:TypeName>
  <wfs:TypeName>kad:Gebouw</wfs:TypeName>
</wfs:DescribeFeatureType>"#;

    pub const GET_FEATURE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wfs:GetFeature service="WFS" version="2.0.0" count="3" startIndex="0"
    outputFormat="application/gml+xml; version=3.2"
    xmlns:wfs="http://www.opengis.net/wfs/2.0"
    xmlns:fes="http://www.opengis.net/fes/2.0"
    xmlns:gml="http://www.opengis.net/gml/3.2"
    xmlns:kad="http://kadaster.nl"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xsi:schemaLocation="http://www.opengis.net/wfs/2.0 http://schemas.opengis.net/wfs/2.0/wfs.xsd">
  <wfs:Query typeNames="kad:Perceel" srsName="urn:ogc:def:crs:EPSG::28992">
    <fes:Filter>
      <fes:And>
        <fes:PropertyIsEqualTo matchCase="false">
          <fes:ValueReference>kad:gemeente</fes:ValueReference>
          <fes:Literal>Apeldoorn</fes:Literal>
        </fes:PropertyIsEqualTo>
        <fes:BBOX>
          <fes:ValueReference>kad:geom</fes:ValueReference>
          <gml:Envelope srsName="urn:ogc:def:crs:EPSG::28992">
            <gml:lowerCorner>190000 470000</gml:lowerCorner>
            <gml:upperCorner>200000 480000</gml:upperCorner>
          </gml:Envelope>
        </fes:BBOX>
      </fes:And>
    </fes:Filter>
    <fes:SortBy>
      <fes:SortProperty>
        <fes:ValueReference>kad:perceelnummer</fes:ValueReference>
        <fes:SortOrder>DESC</fes:SortOrder>
      </fes:SortProperty>
    </fes:SortBy>
  </wfs:Query>
</wfs:GetFeature>"#;

    /// GetFeature whose root repeats attributes and namespace declarations.
    pub const GET_FEATURE_DUPLICATE_ATTRIBUTES: &str = r#"<GetFeature service="WFS" version="2.0.0"
    xmlns="http://www.opengis.net/wfs/2.0"
    xmlns:kad="http://kadaster.nl/old" handle="first" handle="second">
  <Query typeNames="kad:Perceel"/>
</GetFeature>"#;

    pub const FILTER: &str = r#"<fes:Filter xmlns:fes="http://www.opengis.net/fes/2.0" xmlns:gml="http://www.opengis.net/gml/3.2">
  <fes:Or>
    <fes:PropertyIsLike wildCard="*" singleChar="." escapeChar="!">
      <fes:ValueReference>name</fes:ValueReference>
      <fes:Literal>Ape*</fes:Literal>
    </fes:PropertyIsLike>
    <fes:Not>
      <fes:PropertyIsNull>
        <fes:ValueReference>owner</fes:ValueReference>
      </fes:PropertyIsNull>
    </fes:Not>
    <fes:PropertyIsBetween>
      <fes:ValueReference>area</fes:ValueReference>
      <fes:LowerBoundary><fes:Literal>100</fes:Literal></fes:LowerBoundary>
      <fes:UpperBoundary><fes:Literal>500</fes:Literal></fes:UpperBoundary>
    </fes:PropertyIsBetween>
    <fes:DWithin>
      <fes:ValueReference>geom</fes:ValueReference>
      <gml:Point gml:id="p1" srsName="urn:ogc:def:crs:EPSG::4326">
        <gml:pos>52.1 5.3</gml:pos>
      </gml:Point>
      <fes:Distance uom="m">250</fes:Distance>
    </fes:DWithin>
  </fes:Or>
</fes:Filter>"#;

    pub const RESOURCE_ID_FILTER: &str = r#"<Filter>
  <ResourceId rid="one"/>
  <ResourceId rid="two"/>
  <PropertyIsNil nilReason="missing"><ValueReference>owner</ValueReference></PropertyIsNil>
  <ResourceId rid="one"/>
</Filter>"#;

    pub const GET_MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GetMap xmlns="http://www.opengis.net/sld"
    xmlns:se="http://www.opengis.net/se"
    xmlns:ows="http://www.opengis.net/ows/1.1"
    xmlns:wms="http://www.opengis.net/wms"
    xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
    xsi:schemaLocation="http://www.opengis.net/sld GetMap.xsd"
    version="1.3.0" service="WMS">
  <StyledLayerDescriptor version="1.1.0">
    <NamedLayer>
      <se:Name>Rivers</se:Name>
      <NamedStyle><se:Name>CenterLine</se:Name></NamedStyle>
    </NamedLayer>
    <NamedLayer>
      <se:Name>Roads</se:Name>
    </NamedLayer>
  </StyledLayerDescriptor>
  <CRS>EPSG:4326</CRS>
  <BoundingBox crs="EPSG:4326">
    <ows:LowerCorner>-180.0 -90.0</ows:LowerCorner>
    <ows:UpperCorner>180.0 90.0</ows:UpperCorner>
  </BoundingBox>
  <Output>
    <Size><Width>1024</Width><Height>512</Height></Size>
    <wms:Format>image/jpeg</wms:Format>
    <Transparent>false</Transparent>
  </Output>
  <Exceptions>XML</Exceptions>
</GetMap>"#;

    pub const GET_FEATURE_INFO: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<GetFeatureInfo xmlns="http://www.opengis.net/sld"
    xmlns:se="http://www.opengis.net/se"
    xmlns:ows="http://www.opengis.net/ows/1.1"
    xmlns:wms="http://www.opengis.net/wms"
    version="1.3.0" service="WMS">
  <StyledLayerDescriptor version="1.1.0">
    <NamedLayer><se:Name>Rivers</se:Name></NamedLayer>
  </StyledLayerDescriptor>
  <CRS>EPSG:28992</CRS>
  <BoundingBox>
    <ows:LowerCorner>0 300000</ows:LowerCorner>
    <ows:UpperCorner>300000 600000</ows:UpperCorner>
  </BoundingBox>
  <Output>
    <Size><Width>256</Width><Height>256</Height></Size>
  </Output>
  <QueryLayer>Rivers</QueryLayer>
  <I>128</I>
  <J>64</J>
  <InfoFormat>application/json</InfoFormat>
  <FeatureCount>5</FeatureCount>
</GetFeatureInfo>"#;
}

/// KVP requests as (key, value) pairs.
pub mod kvp {
    pub const GET_CAPABILITIES_WMS: &[(&str, &str)] = &[
        ("SERVICE", "WMS"),
        ("REQUEST", "GetCapabilities"),
        ("VERSION", "1.3.0"),
    ];

    pub const DESCRIBE_FEATURE_TYPE: &[(&str, &str)] = &[
        ("SERVICE", "WFS"),
        ("REQUEST", "DescribeFeatureType"),
        ("VERSION", "2.0.0"),
        ("TYPENAMES", "kad:Perceel,kad:Gebouw"),
        ("NAMESPACES", "xmlns(kad,http://kadaster.nl)"),
    ];

    pub const GET_FEATURE: &[(&str, &str)] = &[
        ("SERVICE", "WFS"),
        ("REQUEST", "GetFeature"),
        ("VERSION", "2.0.0"),
        ("TYPENAMES", "kad:Perceel"),
        ("COUNT", "10"),
        ("STARTINDEX", "20"),
        ("SRSNAME", "urn:ogc:def:crs:EPSG::28992"),
        ("SORTBY", "kad:perceelnummer DESC,kad:gemeente"),
        ("BBOX", "190000,470000,200000,480000"),
    ];

    pub const GET_MAP: &[(&str, &str)] = &[
        ("SERVICE", "WMS"),
        ("REQUEST", "GetMap"),
        ("VERSION", "1.3.0"),
        ("LAYERS", "Rivers,Roads"),
        ("STYLES", "CenterLine,"),
        ("CRS", "EPSG:4326"),
        ("BBOX", "-90,-180,90,180"),
        ("WIDTH", "1024"),
        ("HEIGHT", "512"),
        ("FORMAT", "image/png"),
        ("TRANSPARENT", "TRUE"),
    ];

    pub const GET_FEATURE_INFO: &[(&str, &str)] = &[
        ("SERVICE", "WMS"),
        ("REQUEST", "GetFeatureInfo"),
        ("VERSION", "1.3.0"),
        ("LAYERS", "Rivers"),
        ("STYLES", ""),
        ("CRS", "EPSG:28992"),
        ("BBOX", "0,300000,300000,600000"),
        ("WIDTH", "256"),
        ("HEIGHT", "256"),
        ("QUERY_LAYERS", "Rivers"),
        ("INFO_FORMAT", "application/json"),
        ("I", "128"),
        ("J", "64"),
        ("FEATURE_COUNT", "5"),
    ];
}
